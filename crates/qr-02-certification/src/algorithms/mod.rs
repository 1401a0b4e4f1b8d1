//! Pure stage state machines. No channels, no timers.

pub mod graphing;
pub mod paving;
pub mod verifying;

pub use graphing::{GraphingState, GraphingWait};
pub use paving::{PavingState, PavingStatus, StallKey};
pub use verifying::VerifyingState;
