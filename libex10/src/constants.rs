// libex10-rs/libex10/src/constants.rs
//! Wire, buffer and timing constants shared across the crate.

/// Largest single SPI transfer the device accepts, in bytes.
pub const SPI_BURST_SIZE: usize = 1023;

/// Command and response buffers are one SPI burst each.
pub const COMMAND_BUFFER_SIZE: usize = SPI_BURST_SIZE;
/// See [`COMMAND_BUFFER_SIZE`].
pub const RESPONSE_BUFFER_SIZE: usize = SPI_BURST_SIZE;

/// The bootloader accepts commands of up to 2048 data bytes plus 4 bytes of
/// framing.
pub const BOOTLOADER_MAX_COMMAND_SIZE: usize = 2048 + 4;

/// Largest payload of a StartUpload/ContinueUpload command.
pub const MAX_IMAGE_CHUNK_SIZE: usize = BOOTLOADER_MAX_COMMAND_SIZE - 2;

/// Image chunk size used by uploads: the smaller of what an SPI burst and a
/// bootloader command can carry after the opcode and destination bytes.
pub const UPLOAD_CHUNK_SIZE: usize = {
    let burst = SPI_BURST_SIZE - 2;
    let command = MAX_IMAGE_CHUNK_SIZE - 2;
    if burst < command { burst } else { command }
};

/// Size of one flash info page.
pub const INFO_PAGE_SIZE: usize = 2048;

/// Physical size of the device EventFifo.
pub const EVENT_FIFO_SIZE: usize = 4096;

/// Default EventFifo interrupt threshold in bytes.
pub const DEFAULT_EVENT_FIFO_THRESHOLD: usize = 2048;

/// Number of EventFifo buffers in the default pool.
pub const EVENT_FIFO_BUFFER_COUNT: usize = 8;

/// Fixed EventFifo packet header sentinel (format version).
pub const EVENT_FIFO_SHA: u16 = 0xbf4b;

/// SPI clock for the application firmware.
pub const DEFAULT_SPI_CLOCK_HZ: u32 = 4_000_000;

/// Maximum SPI clock the bootloader tolerates.
pub const BOOTLOADER_SPI_CLOCK_HZ: u32 = 1_000_000;

/// Reference oscillator frequency written to FrefFreq before flash access.
pub const TCXO_FREQ_KHZ: u32 = 24_000;

/// Stored-settings page prefix written ahead of the serialized Write frame.
pub const STORED_SETTINGS_PREFIX: [u8; 8] = [0xff; 8];

/// Bootloader git hashes with known device revisions.
pub const BOOTLOADER_GIT_HASH_REV_4: u32 = 0xb3a0_1818;
/// See [`BOOTLOADER_GIT_HASH_REV_4`].
pub const BOOTLOADER_GIT_HASH_REV_3: u32 = 0x8044_99bc;

/// Board supply on to ENABLE asserted, in milliseconds.
pub const VDD_TO_ENABLE_DELAY_MS: u64 = 5;
/// ENABLE asserted to RESET_N released. Also held after the release in a
/// bootloader power-up.
pub const ENABLE_TO_RESET_RELEASE_DELAY_MS: u64 = 10;
/// Off time after a power-down, so the next power-up starts clean.
pub const POWER_DOWN_HOLD_MS: u64 = 50;
/// READY_N hold around the reset release of a bootloader power-up.
pub const READY_N_HOLD_MS: u64 = 1;
/// ENABLE deasserted to RESET_N asserted.
pub const ENABLE_OFF_TO_RESET_MS: u64 = 1;
/// PA bias settling time after enabling it.
pub const PA_BIAS_POWER_ON_DELAY_MS: u64 = 4;

// Reference board GPIO assignment (Ex10 DIGITAL_IO bit positions).
/// Unconnected on the development board.
pub const GPIO_PIN_DIO_0: u8 = 0;
/// Unconnected on the development board.
pub const GPIO_PIN_DIO_1: u8 = 1;
/// Interrupt line from the Ex10, active low.
pub const GPIO_PIN_IRQ_N: u8 = 5;
/// Unconnected on the development board.
pub const GPIO_PIN_DIO_6: u8 = 6;
/// Baseband filter: highpass `0`, bandpass `1`.
pub const GPIO_PIN_BASEBAND_FILTER: u8 = 7;
/// Unconnected on the development board.
pub const GPIO_PIN_DIO_8: u8 = 8;
/// Unconnected on the development board.
pub const GPIO_PIN_DIO_13: u8 = 13;
/// VCC_PA level: low power (<= 27 dBm) `0`, high power `1`.
pub const GPIO_PIN_POWER_RANGE: u8 = 15;
/// Enables the PA bias on APC1 and APC2, active high.
pub const GPIO_PIN_PA_BIAS_ENABLE: u8 = 16;
/// Enables the VCC_PA supply, active high.
pub const GPIO_PIN_RF_PS_ENABLE: u8 = 17;
/// Tx SAW filter: 902-928 MHz `0`, 866-868 MHz `1`.
pub const GPIO_PIN_SAW_FILTER: u8 = 18;
/// Antenna select: port 2 `0`, port 1 `1`.
pub const GPIO_PIN_ANTENNA: u8 = 19;

/// Every board pin the host drives as an output.
pub const GPIO_BOARD_OUTPUT_ENABLES: u32 = (1 << GPIO_PIN_ANTENNA)
    | (1 << GPIO_PIN_BASEBAND_FILTER)
    | (1 << GPIO_PIN_DIO_0)
    | (1 << GPIO_PIN_DIO_1)
    | (1 << GPIO_PIN_DIO_6)
    | (1 << GPIO_PIN_DIO_8)
    | (1 << GPIO_PIN_DIO_13)
    | (1 << GPIO_PIN_PA_BIAS_ENABLE)
    | (1 << GPIO_PIN_POWER_RANGE)
    | (1 << GPIO_PIN_RF_PS_ENABLE)
    | (1 << GPIO_PIN_SAW_FILTER);

/// Antenna 1, bandpass baseband filter, high PA range, PA bias and RF
/// supply on, upper band SAW filter.
pub const GPIO_BOARD_DEFAULT_LEVELS: u32 = (1 << GPIO_PIN_ANTENNA)
    | (1 << GPIO_PIN_BASEBAND_FILTER)
    | (1 << GPIO_PIN_POWER_RANGE)
    | (1 << GPIO_PIN_PA_BIAS_ENABLE)
    | (1 << GPIO_PIN_RF_PS_ENABLE);
