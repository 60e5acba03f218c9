// Core consensus module - the crowd-vote ban protocol.

pub mod consensus_models;
pub mod consensus_service;
pub mod poll_identity;

pub use consensus_models::*;
pub use consensus_service::*;
