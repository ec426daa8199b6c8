// libex10-rs/libex10/src/device/config.rs

//! Board configuration.

use crate::constants::{
    DEFAULT_EVENT_FIFO_THRESHOLD, DEFAULT_SPI_CLOCK_HZ, EVENT_FIFO_BUFFER_COUNT, EVENT_FIFO_SIZE,
    TCXO_FREQ_KHZ,
};
use crate::utils::{DEFAULT_OP_TIMEOUT_MS, NOMINAL_READY_N_TIMEOUT_MS};

/// Board level settings applied during bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoardConfig {
    /// SPI clock once the application is running.
    pub spi_clock_hz: u32,
    /// READY_N wait budget per transfer.
    pub ready_n_timeout_ms: u64,
    /// Budget for an op to clear its busy bit.
    pub op_timeout_ms: u64,
    /// EventFifo interrupt level in bytes.
    pub event_fifo_threshold: usize,
    /// Buffers in the EventFifo pool.
    pub fifo_buffer_count: usize,
    /// Bytes per pool buffer.
    pub fifo_buffer_size: usize,
    /// Reference oscillator, written to FrefFreq before flash access.
    pub tcxo_freq_khz: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            spi_clock_hz: DEFAULT_SPI_CLOCK_HZ,
            ready_n_timeout_ms: NOMINAL_READY_N_TIMEOUT_MS,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
            event_fifo_threshold: DEFAULT_EVENT_FIFO_THRESHOLD,
            fifo_buffer_count: EVENT_FIFO_BUFFER_COUNT,
            fifo_buffer_size: EVENT_FIFO_SIZE,
            tcxo_freq_khz: TCXO_FREQ_KHZ,
        }
    }
}

impl BoardConfig {
    /// Set [`spi_clock_hz`](Self::spi_clock_hz).
    pub fn with_spi_clock_hz(mut self, hz: u32) -> Self {
        self.spi_clock_hz = hz;
        self
    }

    /// Set [`ready_n_timeout_ms`](Self::ready_n_timeout_ms).
    pub fn with_ready_n_timeout_ms(mut self, ms: u64) -> Self {
        self.ready_n_timeout_ms = ms;
        self
    }

    /// Set [`op_timeout_ms`](Self::op_timeout_ms).
    pub fn with_op_timeout_ms(mut self, ms: u64) -> Self {
        self.op_timeout_ms = ms;
        self
    }

    /// Set [`event_fifo_threshold`](Self::event_fifo_threshold).
    pub fn with_event_fifo_threshold(mut self, bytes: usize) -> Self {
        self.event_fifo_threshold = bytes;
        self
    }

    /// Size the EventFifo buffer pool.
    pub fn with_fifo_buffers(mut self, count: usize, size: usize) -> Self {
        self.fifo_buffer_count = count;
        self.fifo_buffer_size = size;
        self
    }

    /// Set [`tcxo_freq_khz`](Self::tcxo_freq_khz).
    pub fn with_tcxo_freq_khz(mut self, khz: u32) -> Self {
        self.tcxo_freq_khz = khz;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_board() {
        let c = BoardConfig::default();
        assert_eq!(c.spi_clock_hz, 4_000_000);
        assert_eq!(c.ready_n_timeout_ms, 2500);
        assert_eq!(c.op_timeout_ms, 10_000);
        assert_eq!(c.event_fifo_threshold, 2048);
        assert_eq!((c.fifo_buffer_count, c.fifo_buffer_size), (8, 4096));
        assert_eq!(c.tcxo_freq_khz, 24_000);
    }

    #[test]
    fn setters_chain() {
        let c = BoardConfig::default()
            .with_op_timeout_ms(50)
            .with_fifo_buffers(2, 8192)
            .with_event_fifo_threshold(0);
        assert_eq!(c.op_timeout_ms, 50);
        assert_eq!(c.fifo_buffer_size, 8192);
        assert_eq!(c.event_fifo_threshold, 0);
    }
}
