// libex10-rs/libex10/src/protocol/transactor.rs

//! Framed command exchange over the SPI host interface.

use std::sync::Arc;

#[cfg(feature = "diagnostics")]
use log::trace;
use log::warn;

use crate::constants::SPI_BURST_SIZE;
use crate::error::Module;
use crate::transport::{GpioInterface, HostInterface};
use crate::types::{HostResultCode, ResponseCode};
use crate::utils::hex_dump;
use crate::{Error, Result};

/// One command/response exchange at a time over a half-duplex link.
///
/// Before each transfer in either direction the transactor waits for the
/// device to pull READY_N low. The same line signals "command consumed" and
/// "response ready".
#[derive(Default)]
pub struct CommandTransactor {
    host: Option<Box<dyn HostInterface>>,
    gpio: Option<Arc<dyn GpioInterface>>,
    last_command: Vec<u8>,
}

impl std::fmt::Debug for CommandTransactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTransactor")
            .field("initialized", &self.is_initialized())
            .field("last_command", &hex_dump(&self.last_command, 8))
            .finish()
    }
}

impl CommandTransactor {
    /// Transactor with no drivers attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the board drivers.
    pub fn init(&mut self, gpio: Arc<dyn GpioInterface>, host: Box<dyn HostInterface>) {
        self.gpio = Some(gpio);
        self.host = Some(host);
    }

    /// Detach the board drivers, handing the host interface back.
    pub fn deinit(&mut self) -> Option<Box<dyn HostInterface>> {
        self.gpio = None;
        self.last_command.clear();
        self.host.take()
    }

    /// Both drivers attached.
    pub fn is_initialized(&self) -> bool {
        self.host.is_some() && self.gpio.is_some()
    }

    /// Bytes of the most recently sent command.
    pub fn last_command(&self) -> &[u8] {
        &self.last_command
    }

    /// Direct access to the host interface for open/close.
    pub fn host_mut(&mut self) -> Result<&mut dyn HostInterface> {
        match self.host.as_deref_mut() {
            Some(host) => Ok(host),
            None => Err(Error::NullPointer {
                module: Module::CommandTransactor,
            }),
        }
    }

    fn parts(&mut self) -> Result<(&mut dyn HostInterface, &dyn GpioInterface)> {
        match (self.host.as_deref_mut(), self.gpio.as_deref()) {
            (Some(host), Some(gpio)) => Ok((host, gpio)),
            _ => Err(Error::NullPointer {
                module: Module::CommandTransactor,
            }),
        }
    }

    /// Wait for READY_N, then write the whole frame.
    pub fn send(&mut self, frame: &[u8], ready_n_timeout_ms: u64) -> Result<()> {
        self.last_command.clear();
        self.last_command.extend_from_slice(frame);
        let (host, gpio) = self.parts()?;

        #[cfg(feature = "diagnostics")]
        trace!("cmd  > {}", hex_dump(frame, 64));

        gpio.busy_wait_ready_n(ready_n_timeout_ms)
            .map_err(|_| Error::Timeout {
                module: Module::CommandTransactor,
            })?;

        match host.write(frame) {
            Ok(n) if n == frame.len() => Ok(()),
            Ok(n) => Err(Error::UnexpectedTxLength {
                module: Module::CommandTransactor,
                expected: frame.len(),
                actual: n,
            }),
            Err(_) => Err(Error::UnexpectedTxLength {
                module: Module::CommandTransactor,
                expected: frame.len(),
                actual: 0,
            }),
        }
    }

    /// Wait for READY_N, then read exactly `buf.len()` bytes.
    pub fn receive(&mut self, buf: &mut [u8], ready_n_timeout_ms: u64) -> Result<()> {
        let last_code = self.last_command.first().copied().unwrap_or(0);
        // the device can return one byte more than it accepts
        if buf.len() > SPI_BURST_SIZE + 1 {
            warn!(
                "receive: last command {:#04x}: response length {} > burst size {}",
                last_code,
                buf.len(),
                SPI_BURST_SIZE
            );
            return Err(Error::BadParamValue {
                module: Module::CommandTransactor,
                reason: "response longer than one SPI burst",
            });
        }

        let (host, gpio) = self.parts()?;
        gpio.busy_wait_ready_n(ready_n_timeout_ms)
            .map_err(|_| Error::Timeout {
                module: Module::CommandTransactor,
            })?;

        let received = host.read(buf).map_err(|status| Error::HostInterface {
            module: Module::CommandTransactor,
            status,
        })?;

        if received != buf.len() {
            warn!(
                "response length {}, expected {}; command {:#04x} [{}]; response [{}]",
                received,
                buf.len(),
                last_code,
                hex_dump(&self.last_command, 32),
                hex_dump(&buf[..received.min(buf.len())], 32)
            );
            return Err(Error::CommandsWithResponse {
                result_code: ResponseCode::Success as u8,
                command_code: last_code,
                host_result: HostResultCode::ReceivedLengthIncorrect,
            });
        }

        #[cfg(feature = "diagnostics")]
        trace!("resp < {}", hex_dump(buf, 64));

        Ok(())
    }

    /// Send `frame`, then read the response into `buf`.
    pub fn send_and_receive(
        &mut self,
        frame: &[u8],
        buf: &mut [u8],
        ready_n_timeout_ms: u64,
    ) -> Result<()> {
        self.send(frame, ready_n_timeout_ms)?;
        self.receive(buf, ready_n_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockGpio, ScriptedHost};

    fn transactor(host: ScriptedHost) -> (CommandTransactor, Arc<MockGpio>) {
        let gpio = Arc::new(MockGpio::new());
        let mut t = CommandTransactor::new();
        t.init(gpio.clone(), Box::new(host));
        (t, gpio)
    }

    #[test]
    fn uninitialized_is_null_pointer() {
        let mut t = CommandTransactor::new();
        assert!(matches!(
            t.send(&[0x01], 10),
            Err(Error::NullPointer { .. })
        ));
        assert!(matches!(
            t.receive(&mut [0u8; 2], 10),
            Err(Error::NullPointer { .. })
        ));
    }

    #[test]
    fn send_and_receive_roundtrip() {
        let host = ScriptedHost::new();
        host.push_response(vec![0xa5, 0x02, 0x00]);
        let (mut t, _gpio) = transactor(host.clone());
        let mut buf = [0u8; 3];
        t.send_and_receive(&[0x01, 0x06, 0x00, 0x02, 0x00], &mut buf, 100)
            .unwrap();
        assert_eq!(buf, [0xa5, 0x02, 0x00]);
        assert_eq!(host.sent(), vec![vec![0x01, 0x06, 0x00, 0x02, 0x00]]);
        assert_eq!(t.last_command()[0], 0x01);
    }

    #[test]
    fn short_read_reports_last_command() {
        let host = ScriptedHost::new();
        host.push_response(vec![0xa5]);
        let (mut t, _gpio) = transactor(host);
        let mut buf = [0u8; 4];
        match t.send_and_receive(&[0x0c, 0, 0, 0, 0, 1, 0], &mut buf, 100) {
            Err(Error::CommandsWithResponse {
                command_code,
                host_result,
                ..
            }) => {
                assert_eq!(command_code, 0x0c);
                assert_eq!(host_result, HostResultCode::ReceivedLengthIncorrect);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn oversize_receive_rejected() {
        let (mut t, _gpio) = transactor(ScriptedHost::new());
        let mut buf = vec![0u8; SPI_BURST_SIZE + 2];
        assert!(matches!(
            t.receive(&mut buf, 10),
            Err(Error::BadParamValue { .. })
        ));
    }

    #[test]
    fn host_read_error_keeps_status() {
        let host = ScriptedHost::new();
        host.fail_next_read(-5);
        let (mut t, _gpio) = transactor(host);
        assert!(matches!(
            t.receive(&mut [0u8; 2], 10),
            Err(Error::HostInterface { status: -5, .. })
        ));
    }

    #[test]
    fn short_write_is_unexpected_tx_length() {
        let host = ScriptedHost::new();
        host.truncate_writes_to(2);
        let (mut t, _gpio) = transactor(host);
        assert!(matches!(
            t.send(&[1, 2, 3, 4], 10),
            Err(Error::UnexpectedTxLength {
                expected: 4,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn ready_n_stuck_high_times_out() {
        let (mut t, gpio) = transactor(ScriptedHost::new());
        gpio.set_ready_n(true);
        assert!(matches!(t.send(&[0x01], 5), Err(Error::Timeout { .. })));
    }
}
