//! Sequencing algorithms

pub mod gap_sequencer;

pub use gap_sequencer::GapSequencer;
