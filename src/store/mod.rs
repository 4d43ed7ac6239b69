// groupsconnector/src/store/mod.rs
pub(crate) mod groups;
pub(crate) mod watermark;

pub use groups::{GroupStore, ReconcileSummary};
pub use watermark::{FileWatermarkStore, WatermarkStore};
