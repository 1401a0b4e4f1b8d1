//! Application layer: sequencer workers, local ordering and forwarding

pub mod clock;
pub mod forwarder;
pub mod local_order;
pub mod registry;

pub use clock::MonotonicClock;
pub use forwarder::RequestForwarder;
pub use local_order::{LocalOrderService, LocalOrderer};
pub use registry::{SequencerRegistry, SourceKind};
