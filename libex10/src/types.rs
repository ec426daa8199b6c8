// libex10-rs/libex10/src/types.rs

//! Device code tables and fixed-layout register values.

use bitflags::bitflags;
use derive_more::Display;
use std::convert::TryFrom;

use crate::error::Module;
use crate::Error;

/// Where the device firmware is executing, as reported by the Status register.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunLocation {
    /// Flash and upload services only.
    #[display(fmt = "bootloader")]
    Bootloader = 1,
    /// Normal firmware; ops and the EventFifo are available.
    #[display(fmt = "application")]
    Application = 2,
}

impl RunLocation {
    /// Decode the 2-bit status field of the Status register.
    pub fn from_status(raw: u16) -> Option<Self> {
        match raw & 0x3 {
            1 => Some(Self::Bootloader),
            2 => Some(Self::Application),
            _ => None,
        }
    }

    /// Raw value, as used in the Reset command.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Device power state managed by [`crate::device::PowerModes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerMode {
    /// Board power removed.
    #[display(fmt = "off")]
    Off,
    /// Core powered, analog and RF supplies off.
    #[display(fmt = "standby")]
    Standby,
    /// Analog powered, PA bias and RF supply off.
    #[display(fmt = "ready cold")]
    ReadyCold,
    /// Everything powered, ready to transmit.
    #[display(fmt = "ready")]
    Ready,
}

/// First byte of a command response.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ResponseCode {
    Success = 0xa5,
    CommandInvalid = 0x01,
    ArgumentInvalid = 0x02,
    ResponseOverflow = 0x06,
    CommandMalformed = 0x07,
    AddressWriteFailure = 0x08,
    ImageInvalid = 0x09,
    LengthInvalid = 0x0a,
    UploadStateInvalid = 0x0b,
    BadCrc = 0x0e,
    FlashInvalidPage = 0x0f,
    FlashPageLocked = 0x10,
    FlashEraseFailure = 0x11,
    FlashProgramFailure = 0x12,
    StoredSettingsMalformed = 0x13,
    NotEnoughSpace = 0x14,
}

impl TryFrom<u8> for ResponseCode {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        let code = match raw {
            0xa5 => Self::Success,
            0x01 => Self::CommandInvalid,
            0x02 => Self::ArgumentInvalid,
            0x06 => Self::ResponseOverflow,
            0x07 => Self::CommandMalformed,
            0x08 => Self::AddressWriteFailure,
            0x09 => Self::ImageInvalid,
            0x0a => Self::LengthInvalid,
            0x0b => Self::UploadStateInvalid,
            0x0e => Self::BadCrc,
            0x0f => Self::FlashInvalidPage,
            0x10 => Self::FlashPageLocked,
            0x11 => Self::FlashEraseFailure,
            0x12 => Self::FlashProgramFailure,
            0x13 => Self::StoredSettingsMalformed,
            0x14 => Self::NotEnoughSpace,
            _ => {
                return Err(Error::BadParamValue {
                    module: Module::Commands,
                    reason: "unknown response code",
                });
            }
        };
        Ok(code)
    }
}

/// Command opcodes, the first byte of every command frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CommandCode {
    Read = 0x01,
    Write = 0x02,
    ReadFifo = 0x03,
    StartUpload = 0x04,
    ContinueUpload = 0x05,
    CompleteUpload = 0x06,
    ReValidateMainImage = 0x07,
    Reset = 0x08,
    TestTransfer = 0x0a,
    WriteInfoPage = 0x0b,
    TestRead = 0x0c,
    InsertFifoEvent = 0x0e,
}

impl CommandCode {
    #[allow(missing_docs)]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Host-side classification attached to response errors.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HostResultCode {
    /// No host-side problem.
    #[display(fmt = "success")]
    Success = 0,
    /// The response was shorter than expected.
    #[display(fmt = "received length incorrect")]
    ReceivedLengthIncorrect = 1,
    /// TestTransfer echo did not match.
    #[display(fmt = "test transfer verify error")]
    TestTransferVerifyError = 2,
}

/// Ops written to the OpsControl register.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OpId {
    Idle = 0xa0,
    LogTestOp = 0xa1,
    MeasureAdcOp = 0xa2,
    TxRampUpOp = 0xa3,
    TxRampDownOp = 0xa4,
    SetTxCoarseGainOp = 0xa5,
    SetTxFineGainOp = 0xa6,
    RadioPowerControlOp = 0xa7,
    SetRfModeOp = 0xa8,
    SetRxGainOp = 0xa9,
    LockSynthesizerOp = 0xaa,
    EventFifoTestOp = 0xab,
    RxRunSjcOp = 0xac,
    SetGpioOp = 0xad,
    SetClearGpioPinsOp = 0xae,
    StartInventoryRoundOp = 0xb0,
    RunPrbsDataOp = 0xb1,
    SendSelectOp = 0xb2,
    SetDacOp = 0xb3,
    SetATestMuxOp = 0xb4,
    PowerControlLoopOp = 0xb5,
    MeasureRssiOp = 0xb6,
    UsTimerStartOp = 0xb7,
    UsTimerWaitOp = 0xb8,
    AggregateOp = 0xb9,
    ListenBeforeTalkOp = 0xba,
    BerTestOp = 0xc0,
    EtsiBurstOp = 0xc1,
    HpfOverrideTestOp = 0xc2,
    SetDcOffsetOp = 0xc4,
}

impl OpId {
    #[allow(missing_docs)]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Error codes reported in the OpsStatus register.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OpsStatusCode {
    None = 0x00,
    UnknownOp = 0x01,
    UnknownError = 0x02,
    InvalidParameter = 0x03,
    PllNotLocked = 0x04,
    PowerControlTargetFailed = 0x05,
    InvalidTxState = 0x06,
    RadioPowerNotEnabled = 0x07,
    AggregateBufferOverflow = 0x08,
    AggregateInnerOpError = 0x09,
    SjcCdacRangeError = 0x0b,
    SjcResidueThresholdExceeded = 0x0c,
    DroopCompensationTooManyAdcChannels = 0x0d,
    EventFailedToSend = 0x0e,
    AggregateEx10CommandError = 0x0f,
    UnsupportedCommand = 0x10,
    BerRxHung = 0x11,
    Timeout = 0x12,
}

/// Flash info pages addressable with the WriteInfoPage command.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PageId {
    MainBlock = 0,
    FeatureControls = 1,
    Manufacturing = 2,
    Calibration = 3,
    StoredSettings = 4,
}

/// Fifo selector byte of the ReadFifo command.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FifoSelection {
    EventFifo = 0,
}

/// Why the device stayed in the bootloader.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RemainReason {
    /// Nothing recorded, or an unknown value.
    #[display(fmt = "no reason")]
    NoReason = 0,
    /// The host held READY_N low across reset.
    #[display(fmt = "READY_N asserted")]
    ReadyNAsserted = 1,
    /// The application image failed validation.
    #[display(fmt = "application image invalid")]
    ApplicationImageInvalid = 2,
    /// A Reset command asked for the bootloader.
    #[display(fmt = "reset command")]
    ResetCommand = 3,
    /// The application crashed.
    #[display(fmt = "crash")]
    Crash = 4,
    /// Watchdog expiry.
    #[display(fmt = "watchdog")]
    Watchdog = 5,
    /// CPU lockup.
    #[display(fmt = "lockup")]
    Lockup = 6,
}

impl RemainReason {
    /// Unknown values map to `NoReason`.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::ReadyNAsserted,
            2 => Self::ApplicationImageInvalid,
            3 => Self::ResetCommand,
            4 => Self::Crash,
            5 => Self::Watchdog,
            6 => Self::Lockup,
            _ => Self::NoReason,
        }
    }
}

/// Product SKU reported by the ProductSku register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[allow(missing_docs)]
pub enum ProductSku {
    /// Unrecognised SKU value.
    #[display(fmt = "unknown")]
    Unknown,
    #[display(fmt = "E310")]
    E310,
    #[display(fmt = "E510")]
    E510,
    #[display(fmt = "E710")]
    E710,
    #[display(fmt = "E910")]
    E910,
}

impl ProductSku {
    /// Decode the ProductSku register. Unknown values map to `Unknown`.
    pub fn from_u16(raw: u16) -> Self {
        match raw {
            0x0310 => Self::E310,
            0x0510 => Self::E510,
            0x0710 => Self::E710,
            0x0910 => Self::E910,
            _ => Self::Unknown,
        }
    }
}

bitflags! {
    /// InterruptMask / InterruptStatus register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptFlags: u32 {
        /// An op finished.
        const OP_DONE                 = 1 << 0;
        /// The inventory sequencer halted on a tag.
        const HALTED                  = 1 << 1;
        /// EventFifo level reached EventFifoIntLevel.
        const EVENT_FIFO_ABOVE_THRESH = 1 << 2;
        /// EventFifo overflowed.
        const EVENT_FIFO_FULL         = 1 << 3;
        /// An inventory round finished.
        const INVENTORY_ROUND_DONE    = 1 << 4;
        /// A halted sequence finished.
        const HALTED_SEQUENCE_DONE    = 1 << 5;
        /// A command failed; see CommandResult.
        const COMMAND_ERROR           = 1 << 6;
        /// An aggregate op finished.
        const AGGREGATE_OP_DONE       = 1 << 7;
    }
}

impl Default for InterruptFlags {
    fn default() -> Self {
        InterruptFlags::empty()
    }
}

impl InterruptFlags {
    /// Decode a register value; unknown bits are dropped.
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self::from_bits_truncate(u32::from_le_bytes(bytes))
    }
}

/// CommandResult register: the first failing command since the last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandResultFields {
    /// Response code of the failing command.
    pub failed_result_code: u8,
    /// Opcode of the failing command.
    pub failed_command_code: u8,
    /// Commands run after the failure.
    pub commands_since_first_error: u16,
}

impl CommandResultFields {
    #[allow(missing_docs)]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            failed_result_code: bytes[0],
            failed_command_code: bytes[1],
            commands_since_first_error: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }

    #[allow(missing_docs)]
    pub fn to_bytes(&self) -> [u8; 4] {
        let count = self.commands_since_first_error.to_le_bytes();
        [
            self.failed_result_code,
            self.failed_command_code,
            count[0],
            count[1],
        ]
    }

    /// No command failed since the register was last read.
    pub fn is_success(&self) -> bool {
        self.failed_result_code == ResponseCode::Success as u8
    }
}

/// OpsStatus register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpsStatusFields {
    /// Op currently or last run.
    pub op_id: u8,
    /// The op is still running.
    pub busy: bool,
    /// [`OpsStatusCode`] of the last op, zero on success.
    pub error: u8,
}

#[allow(missing_docs)]
impl OpsStatusFields {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            op_id: bytes[0],
            busy: bytes[1] & 0x01 != 0,
            error: bytes[2],
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        [self.op_id, self.busy as u8, self.error, 0]
    }
}

/// DeviceInfo register, or the equivalent derived from the bootloader hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    /// Metal fix revision.
    pub eco_revision: u8,
    /// Silicon revision, low byte.
    pub device_revision_lo: u8,
    /// Silicon revision, high byte.
    pub device_revision_hi: u8,
    /// Die identifier.
    pub device_identifier: u8,
}

impl DeviceInfo {
    #[allow(missing_docs)]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            eco_revision: bytes[0],
            device_revision_lo: bytes[1],
            device_revision_hi: bytes[2],
            device_identifier: bytes[3],
        }
    }
}

/// Bootloader ImageValidity register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageValidity {
    /// Set once an image has been validated.
    pub image_valid_marker: bool,
    /// Set when an image was explicitly invalidated.
    pub image_non_valid_marker: bool,
}

impl ImageValidity {
    /// Decode the register byte.
    pub fn from_u8(raw: u8) -> Self {
        Self {
            image_valid_marker: raw & 0x01 != 0,
            image_non_valid_marker: raw & 0x02 != 0,
        }
    }
}

/// Firmware version strings and build identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionInfo {
    /// Human-readable version, NUL padding stripped.
    pub version_string: String,
    /// Source revision of the build.
    pub git_hash: u32,
    #[allow(missing_docs)]
    pub build_number: u32,
}

impl VersionInfo {
    /// Build from raw register contents. The version string is NUL padded.
    pub fn from_registers(version: &[u8], git_hash: [u8; 4], build_number: [u8; 4]) -> Self {
        let end = version.iter().position(|&b| b == 0).unwrap_or(version.len());
        Self {
            version_string: String::from_utf8_lossy(&version[..end]).into_owned(),
            git_hash: u32::from_le_bytes(git_hash),
            build_number: u32::from_le_bytes(build_number),
        }
    }
}

/// RxGainControl register value (analog receive configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RxGainControl(u16);

impl RxGainControl {
    /// 0 dB attenuation, PGA1 12 dB, PGA2 0 dB, PGA3 18 dB, mixer 11.2 dB,
    /// mixer bandwidth enabled.
    pub const DEFAULT: Self = Self(0x44cc);

    /// Wrap a raw register value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw register value.
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    #[allow(missing_docs)]
    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    #[allow(missing_docs)]
    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl Default for RxGainControl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Bit masks written by the SetClearGpioPinsOp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GpioPinsSetClear {
    /// Pins driven high.
    pub output_level_set: u32,
    /// Pins driven low.
    pub output_level_clear: u32,
    /// Pins switched to outputs.
    pub output_enable_set: u32,
    /// Pins switched to inputs.
    pub output_enable_clear: u32,
}

impl GpioPinsSetClear {
    /// Drive a single output pin high or low and enable it as an output.
    pub fn set_pin(&mut self, pin: u8, level: bool) {
        let mask = 1u32 << pin;
        if level {
            self.output_level_set |= mask;
            self.output_level_clear &= !mask;
        } else {
            self.output_level_clear |= mask;
            self.output_level_set &= !mask;
        }
        self.output_enable_set |= mask;
        self.output_enable_clear &= !mask;
    }

    /// PA bias enable pin.
    pub fn set_pa_bias_enable(&mut self, enable: bool) {
        self.set_pin(crate::constants::GPIO_PIN_PA_BIAS_ENABLE, enable);
    }

    /// RF power supply enable pin.
    pub fn set_rf_power_supply_enable(&mut self, enable: bool) {
        self.set_pin(crate::constants::GPIO_PIN_RF_PS_ENABLE, enable);
    }

    /// Board default: antenna 1, bandpass filter, high power range, PA bias
    /// and RF supply on. IRQ_N is never driven.
    pub fn board_default() -> Self {
        use crate::constants::*;
        let allowed = !(1u32 << GPIO_PIN_IRQ_N);
        let enables = GPIO_BOARD_OUTPUT_ENABLES;
        let levels = GPIO_BOARD_DEFAULT_LEVELS;
        Self {
            output_level_set: levels & allowed,
            output_level_clear: !levels & allowed,
            output_enable_set: enables & allowed,
            output_enable_clear: !enables & allowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_location_from_status_bits() {
        assert_eq!(RunLocation::from_status(0x0001), Some(RunLocation::Bootloader));
        assert_eq!(RunLocation::from_status(0xfff2), Some(RunLocation::Application));
        assert_eq!(RunLocation::from_status(0x0000), None);
        assert_eq!(RunLocation::from_status(0x0003), None);
    }

    #[test]
    fn response_code_try_from() {
        assert_eq!(ResponseCode::try_from(0xa5).unwrap(), ResponseCode::Success);
        assert_eq!(ResponseCode::try_from(0x0e).unwrap(), ResponseCode::BadCrc);
        assert!(ResponseCode::try_from(0x55).is_err());
    }

    #[test]
    fn ops_status_decodes_busy_bit() {
        let s = OpsStatusFields::from_bytes([0xa7, 0x01, 0x00, 0x00]);
        assert_eq!(s.op_id, OpId::RadioPowerControlOp as u8);
        assert!(s.busy);
        assert_eq!(s.error, 0);
        assert_eq!(OpsStatusFields::from_bytes(s.to_bytes()), s);
    }

    #[test]
    fn interrupt_flags_ignore_reserved_bits() {
        let f = InterruptFlags::from_le_bytes([0x05, 0xff, 0x00, 0x00]);
        assert!(f.contains(InterruptFlags::OP_DONE));
        assert!(f.contains(InterruptFlags::EVENT_FIFO_ABOVE_THRESH));
        assert!(!f.contains(InterruptFlags::HALTED));
        assert_eq!(f.bits(), 0x05);
    }

    #[test]
    fn version_info_trims_nul_padding() {
        let mut raw = [0u8; 32];
        raw[..6].copy_from_slice(b"v1.2.3");
        let v = VersionInfo::from_registers(&raw, [0x78, 0x56, 0x34, 0x12], [7, 0, 0, 0]);
        assert_eq!(v.version_string, "v1.2.3");
        assert_eq!(v.git_hash, 0x1234_5678);
        assert_eq!(v.build_number, 7);
    }

    #[test]
    fn gpio_set_clear_single_pin() {
        let mut pins = GpioPinsSetClear::default();
        pins.set_pa_bias_enable(true);
        pins.set_rf_power_supply_enable(false);
        assert_eq!(pins.output_level_set, 1 << 16);
        assert_eq!(pins.output_level_clear, 1 << 17);
        assert_eq!(pins.output_enable_set, (1 << 16) | (1 << 17));

        pins.set_pa_bias_enable(false);
        assert_eq!(pins.output_level_set, 0);
        assert_eq!(pins.output_level_clear, (1 << 16) | (1 << 17));
    }

    #[test]
    fn board_default_never_drives_irq_pin() {
        let pins = GpioPinsSetClear::board_default();
        let irq = 1u32 << crate::constants::GPIO_PIN_IRQ_N;
        assert_eq!(pins.output_level_set & irq, 0);
        assert_eq!(pins.output_level_clear & irq, 0);
        assert_eq!(pins.output_enable_set & irq, 0);
        assert_eq!(pins.output_enable_clear & irq, 0);
        assert_ne!(pins.output_level_set & (1 << 16), 0);
    }

    #[test]
    fn sku_and_remain_reason_decode() {
        assert_eq!(ProductSku::from_u16(0x0710), ProductSku::E710);
        assert_eq!(ProductSku::from_u16(0x1234), ProductSku::Unknown);
        assert_eq!(RemainReason::from_u8(2), RemainReason::ApplicationImageInvalid);
        assert_eq!(RemainReason::from_u8(99), RemainReason::NoReason);
    }
}
