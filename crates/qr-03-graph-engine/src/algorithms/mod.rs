//! Graph algorithms: SCC detection, condensation order, linearisation

pub mod kahns;
pub mod linearize;
pub mod tarjan;

pub use kahns::kahns_condensation_order;
pub use linearize::linearize;
pub use tarjan::strongly_connected_components;
