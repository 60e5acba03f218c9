pub mod in_memory;
pub mod sqlite_session_store;

pub use in_memory::*;
pub use sqlite_session_store::*;
