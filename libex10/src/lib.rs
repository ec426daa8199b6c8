// libex10-rs/libex10/src/lib.rs

//! libex10
//!
//! Host driver stack for the Impinj Ex10 RFID reader chip: framed commands
//! over SPI, register access, firmware upload, EventFifo streaming and
//! board power control.
#![warn(missing_docs)]

pub mod constants;
pub mod device;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod registers;
pub mod test_support;
pub mod transport;
pub mod types;
pub mod utils;

pub use crate::error::*;
pub use crate::types::*;

pub use prelude::*;
