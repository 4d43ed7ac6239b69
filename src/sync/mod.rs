// groupsconnector/src/sync/mod.rs
pub(crate) mod logic;
pub(crate) mod planner;

pub use logic::{ItemAction, perform_sync_pass};
pub use planner::{SourceRecord, SyncMode};
