// Core classifier module - the scam-scoring signal for the pipeline.

pub mod classifier_service;

pub use classifier_service::*;
