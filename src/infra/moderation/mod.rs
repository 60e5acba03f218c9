pub mod sqlite_incident_store;

pub use sqlite_incident_store::*;
