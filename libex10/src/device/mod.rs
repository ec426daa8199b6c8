// libex10-rs/libex10/src/device/mod.rs

//! Stateful driver layers, bottom up: commands, protocol, ops and power,
//! then the event queue and the board handle that ties them together.

pub mod builder;
pub mod commands;
pub mod config;
pub mod event_queue;
pub mod fifo_pool;
pub mod handle;
pub mod ops;
pub mod power;
pub mod power_modes;
pub mod protocol;

pub use builder::DeviceBuilder;
pub use commands::Ex10Commands;
pub use config::BoardConfig;
pub use event_queue::{EventFifoQueue, QueueItem};
pub use fifo_pool::{FifoBufferNode, FifoBufferPool, FifoEvent};
pub use handle::{Bootloader, DEFAULT_QUEUE_INTERRUPTS, Device, Initialized, Uninitialized};
pub use ops::Ex10Ops;
pub use power::PowerTransactor;
pub use power_modes::PowerModes;
pub use protocol::{
    Ex10Protocol, FifoDataCallback, InterruptCallback, UploadProgress, WireGuard,
};
