// libex10-rs/libex10/src/prelude.rs

//! Common re-exports.

pub use crate::device::{
    BoardConfig, Bootloader, Device, DeviceBuilder, EventFifoQueue, Ex10Ops, Ex10Protocol,
    FifoEvent, Initialized, PowerModes, QueueItem, Uninitialized,
};
pub use crate::protocol::{EventFifoPacket, PacketType};
pub use crate::registers::RegisterInfo;
pub use crate::transport::{GpioInterface, HostInterface};
pub use crate::{
    Error, ErrorKind, InterruptFlags, Module, Outcome, PowerMode, Result, RunLocation,
    StopReason,
};

pub use crate::utils::{bytes_to_hex, hex_dump, ms};
