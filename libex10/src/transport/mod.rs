// libex10-rs/libex10/src/transport/mod.rs

//! Board driver seams and their simulated counterparts.

pub mod mock;
pub mod traits;

pub use mock::{GpioCall, MockGpio, ScriptedHost, SimulatedEx10};
pub use traits::{ETIMEDOUT, GpioInterface, HostInterface, HostResult, IrqCallback};
