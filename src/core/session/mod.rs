// Core session module - per-chat bot state.

pub mod session_store;

pub use session_store::*;
