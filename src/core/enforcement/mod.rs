// Core enforcement module - turns decisions into transport effects.

pub mod enforcement_service;
pub mod transport_port;

pub use enforcement_service::*;
pub use transport_port::*;
