//! Ports (hexagonal architecture)

pub mod inbound;

pub use inbound::*;
