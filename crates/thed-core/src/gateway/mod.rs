//! Capabilities the core requires from the outside world: a persistence/auth
//! gateway and a text generator, plus the record shapes exchanged with the
//! store.

pub mod records;
pub mod traits;

pub use records::{ProfileRecord, SessionInfo, TaskPatch, TaskRecord};
pub use traits::{SyncGateway, TaskGenerator};
