//! Domain layer for sequencing

pub mod errors;
pub mod recorder;
pub mod reorder_cache;
pub mod sequenced;

pub use errors::*;
pub use recorder::SourceRecorder;
pub use reorder_cache::ReorderCache;
pub use sequenced::Sequenced;
