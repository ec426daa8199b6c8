// libex10-rs/libex10/src/error.rs

//! Error type, error kinds and the three-way [`Outcome`].

use derive_more::Display;
use thiserror::Error;

use crate::types::{CommandResultFields, HostResultCode, OpsStatusFields, RunLocation};

/// Host-side layer that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Module {
    /// Raised by the Ex10 device itself.
    #[display(fmt = "device")]
    Device,
    /// Ready/busy handshake and byte transfers.
    #[display(fmt = "command transactor")]
    CommandTransactor,
    /// Wire frame construction.
    #[display(fmt = "commands")]
    Commands,
    /// The stateful protocol core.
    #[display(fmt = "protocol")]
    Protocol,
    /// Op start/stop and completion polling.
    #[display(fmt = "ops")]
    Ops,
    /// Power-mode state machine.
    #[display(fmt = "power modes")]
    PowerModes,
    /// GPIO power sequencing.
    #[display(fmt = "power transactor")]
    PowerTransactor,
    /// EventFifo buffer pool.
    #[display(fmt = "fifo buffer list")]
    FifoBufferList,
    /// Board bring-up.
    #[display(fmt = "board init")]
    BoardInit,
    /// EventFifo packet parsing.
    #[display(fmt = "event parser")]
    EventParser,
    /// EventFifo consumer queue.
    #[display(fmt = "event queue")]
    EventQueue,
}

/// Common error type.
///
/// Every host-side variant carries the [`Module`] that raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument was out of range.
    #[error("{module}: bad parameter value: {reason}")]
    BadParamValue {
        /// Layer that raised it.
        module: Module,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A buffer or list had the wrong size.
    #[error("{module}: bad parameter length: expected {expected}, got {actual}")]
    BadParamLength {
        /// Layer that raised it.
        module: Module,
        /// Size required.
        expected: usize,
        /// Size given.
        actual: usize,
    },

    /// Address or length not on a word boundary.
    #[error("{module}: address or length misaligned: address {address:#06x}, length {length}")]
    BadParamAlignment {
        /// Layer that raised it.
        module: Module,
        /// Start address.
        address: u32,
        /// Length in bytes.
        length: usize,
    },

    /// A driver or transport was missing.
    #[error("{module}: transport not initialized")]
    NullPointer {
        /// Layer that raised it.
        module: Module,
    },

    /// A wait ran out of time.
    #[error("{module}: operation timed out")]
    Timeout {
        /// Layer that raised it.
        module: Module,
    },

    /// The firmware was not running where it had to be.
    #[error("{module}: run location mismatch: expected {expected}, got {actual:?}")]
    RunLocation {
        /// Layer that raised it.
        module: Module,
        /// Location required.
        expected: RunLocation,
        /// `None` when the location could not be read or decoded.
        actual: Option<RunLocation>,
    },

    /// The call is not valid in the current state.
    #[error("{module}: invalid state: {reason}")]
    InvalidState {
        /// Layer that raised it.
        module: Module,
        /// What was wrong.
        reason: &'static str,
    },

    /// The EventFifo buffer pool is empty.
    #[error("{module}: no free EventFifo buffers")]
    NoFreeEventFifoBuffers {
        /// Layer that raised it.
        module: Module,
    },

    /// The device holds more EventFifo data than a buffer can take.
    #[error("{module}: EventFifo buffer too small: capacity {capacity}, requested {requested}")]
    FreeEventFifoBuffersLengthMismatch {
        /// Layer that raised it.
        module: Module,
        /// Buffer size in bytes.
        capacity: usize,
        /// Bytes waiting in the device.
        requested: usize,
    },

    /// The host interface driver failed.
    #[error("{module}: host interface error: status {status}")]
    HostInterface {
        /// Layer that raised it.
        module: Module,
        /// Negative errno from the driver.
        status: i32,
    },

    /// The GPIO driver failed.
    #[error("{module}: gpio interface error: status {status}")]
    GpioInterface {
        /// Layer that raised it.
        module: Module,
        /// Negative errno from the driver.
        status: i32,
    },

    /// The host driver sent fewer bytes than asked.
    #[error("{module}: unexpected tx length: expected {expected}, got {actual}")]
    UnexpectedTxLength {
        /// Layer that raised it.
        module: Module,
        /// Size required.
        expected: usize,
        /// Size given.
        actual: usize,
    },

    /// An EventFifo packet failed validation.
    #[error("{module}: invalid EventFifo packet")]
    InvalidEventFifoPacket {
        /// Layer that raised it.
        module: Module,
    },

    /// A command without response data failed; read from CommandResult.
    #[error(
        "device command failed: result {:#04x}, command {:#04x}, commands since first error {}",
        .0.failed_result_code,
        .0.failed_command_code,
        .0.commands_since_first_error
    )]
    CommandsNoResponse(CommandResultFields),

    /// A command response carried a failure code.
    #[error(
        "device response error: result {result_code:#04x}, command {command_code:#04x}, host {host_result}"
    )]
    CommandsWithResponse {
        /// First byte of the response.
        result_code: u8,
        /// Opcode of the command that was answered.
        command_code: u8,
        /// Host-side check that failed, if any.
        host_result: HostResultCode,
    },

    /// An op finished with an error code.
    #[error("{module}: op error: op {:#04x}, error {:#04x}", .status.op_id, .status.error)]
    Ops {
        /// Layer that raised it.
        module: Module,
        /// OpsStatus as last read.
        status: OpsStatusFields,
    },

    /// An op was still busy when the wait ended.
    #[error("{module}: op timed out: op {:#04x}, busy {}", .status.op_id, .status.busy)]
    OpsTimeout {
        /// Layer that raised it.
        module: Module,
        /// OpsStatus as last read.
        status: OpsStatusFields,
    },
}

/// Flat classification of [`Error`] used when a caller only needs to branch
/// on the kind of failure. One variant per [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[allow(missing_docs)]
pub enum ErrorKind {
    #[display(fmt = "bad param value")]
    BadParamValue,
    #[display(fmt = "bad param length")]
    BadParamLength,
    #[display(fmt = "bad param alignment")]
    BadParamAlignment,
    #[display(fmt = "null pointer")]
    NullPointer,
    #[display(fmt = "timeout")]
    Timeout,
    #[display(fmt = "run location")]
    RunLocation,
    #[display(fmt = "invalid state")]
    InvalidState,
    #[display(fmt = "no free event fifo buffers")]
    NoFreeEventFifoBuffers,
    #[display(fmt = "event fifo buffer length mismatch")]
    FreeEventFifoBuffersLengthMismatch,
    #[display(fmt = "host interface")]
    HostInterface,
    #[display(fmt = "gpio interface")]
    GpioInterface,
    #[display(fmt = "unexpected tx length")]
    UnexpectedTxLength,
    #[display(fmt = "invalid event fifo packet")]
    InvalidEventFifoPacket,
    #[display(fmt = "commands without response")]
    CommandsNoResponse,
    #[display(fmt = "commands with response")]
    CommandsWithResponse,
    #[display(fmt = "ops")]
    Ops,
    #[display(fmt = "ops timeout")]
    OpsTimeout,
}

impl Error {
    /// The layer that raised the error.
    pub fn module(&self) -> Module {
        match self {
            Self::BadParamValue { module, .. }
            | Self::BadParamLength { module, .. }
            | Self::BadParamAlignment { module, .. }
            | Self::NullPointer { module }
            | Self::Timeout { module }
            | Self::RunLocation { module, .. }
            | Self::InvalidState { module, .. }
            | Self::NoFreeEventFifoBuffers { module }
            | Self::FreeEventFifoBuffersLengthMismatch { module, .. }
            | Self::HostInterface { module, .. }
            | Self::GpioInterface { module, .. }
            | Self::UnexpectedTxLength { module, .. }
            | Self::InvalidEventFifoPacket { module }
            | Self::Ops { module, .. }
            | Self::OpsTimeout { module, .. } => *module,
            Self::CommandsNoResponse(_) | Self::CommandsWithResponse { .. } => Module::Device,
        }
    }

    /// Flat [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadParamValue { .. } => ErrorKind::BadParamValue,
            Self::BadParamLength { .. } => ErrorKind::BadParamLength,
            Self::BadParamAlignment { .. } => ErrorKind::BadParamAlignment,
            Self::NullPointer { .. } => ErrorKind::NullPointer,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::RunLocation { .. } => ErrorKind::RunLocation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NoFreeEventFifoBuffers { .. } => ErrorKind::NoFreeEventFifoBuffers,
            Self::FreeEventFifoBuffersLengthMismatch { .. } => {
                ErrorKind::FreeEventFifoBuffersLengthMismatch
            }
            Self::HostInterface { .. } => ErrorKind::HostInterface,
            Self::GpioInterface { .. } => ErrorKind::GpioInterface,
            Self::UnexpectedTxLength { .. } => ErrorKind::UnexpectedTxLength,
            Self::InvalidEventFifoPacket { .. } => ErrorKind::InvalidEventFifoPacket,
            Self::CommandsNoResponse(_) => ErrorKind::CommandsNoResponse,
            Self::CommandsWithResponse { .. } => ErrorKind::CommandsWithResponse,
            Self::Ops { .. } => ErrorKind::Ops,
            Self::OpsTimeout { .. } => ErrorKind::OpsTimeout,
        }
    }

    /// True for errors reported by the device's own result registers.
    pub fn is_device_error(&self) -> bool {
        self.module() == Module::Device
            || matches!(self, Self::Ops { .. } | Self::OpsTimeout { .. })
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a higher layer asked a loop to stop early. This is neither a
/// failure nor a normal completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// Stop requested by application code with its own code.
    #[display(fmt = "customer stop ({})", _0)]
    Customer(u8),
    /// The consumer saw enough packets.
    #[display(fmt = "consumer done")]
    ConsumerDone,
    /// The waiting period elapsed without new events.
    #[display(fmt = "idle timeout")]
    IdleTimeout,
}

/// Three-way result used by callback driven loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// Completed normally.
    Ok(T),
    /// Failed.
    Error(Error),
    /// Stopped on request before completing.
    StopRequested(StopReason),
}

#[allow(missing_docs)]
impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::StopRequested(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Error(e) => Outcome::Error(e),
            Self::StopRequested(r) => Outcome::StopRequested(r),
        }
    }

    /// Collapse into a plain `Result`. A stop request is reported as
    /// `Ok(None)` so it is never mistaken for a failure.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            Self::Ok(v) => Ok(Some(v)),
            Self::Error(e) => Err(e),
            Self::StopRequested(_) => Ok(None),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(r: Result<T>) -> Self {
        match r {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Error(e),
        }
    }
}
