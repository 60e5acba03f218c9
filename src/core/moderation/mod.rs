// Core moderation module - the decision pipeline for suspected swindlers.

pub mod moderation_models;
pub mod moderation_service;
pub mod strategy_delegator;

pub use moderation_models::*;
pub use moderation_service::*;
