//! Small helpers shared by the driver layers: hex formatting for command
//! dumps and the timeout budgets used by every spin loop.

pub mod hex;
pub mod timeout;

pub use hex::*;
pub use timeout::*;
