// src/io/serial/session.rs
//
// Serial session lifecycle for the sensor link: bounded connect retries with
// a settle delay, non-blocking line polling, and release-on-drop. The
// supervisor owns exactly one session at a time; once `poll_line` reports a
// hard error the session is done and must be dropped.

use std::collections::VecDeque;
use std::io::Read;
use std::thread;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info, warn};

use super::framer::LineFramer;
use crate::config::SerialConfig;
use crate::io::error::IoError;

// ============================================================================
// Serial Session
// ============================================================================

/// An open connection to the sensor device.
///
/// A value of this type only exists in the connected state: `connect` covers
/// the connecting and permanently-failed states, and dropping the value
/// releases the port handle exactly once on every exit path.
pub struct SerialSession {
    port: Box<dyn SerialPort>,
    port_name: String,
    framer: LineFramer,
    pending: VecDeque<String>,
    idle_poll: Duration,
}

impl SerialSession {
    /// Open the configured port, retrying up to the connect ceiling with a
    /// fixed delay between attempts. A successful open is followed by a
    /// settle delay so the device firmware can finish booting before the
    /// first read.
    pub fn connect(config: &SerialConfig) -> Result<SerialSession, IoError> {
        let mut last_error = String::new();

        for attempt in 1..=config.connect_attempts {
            match serialport::new(&config.port, config.baud_rate)
                .timeout(config.read_timeout())
                .open()
            {
                Ok(port) => {
                    info!(
                        port = %config.port,
                        baud = config.baud_rate,
                        "connected to sensor device"
                    );
                    thread::sleep(config.settle_delay());
                    return Ok(SerialSession {
                        port,
                        port_name: config.port.clone(),
                        framer: LineFramer::new(),
                        pending: VecDeque::new(),
                        idle_poll: config.idle_poll(),
                    });
                }
                Err(e) => {
                    warn!(
                        attempt,
                        limit = config.connect_attempts,
                        port = %config.port,
                        error = %e,
                        "serial connect attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < config.connect_attempts {
                        thread::sleep(config.connect_retry_delay());
                    }
                }
            }
        }

        Err(IoError::connection(&config.port, last_error))
    }

    /// Non-blocking poll for the next complete line.
    ///
    /// Returns `Ok(None)` when no line is ready this cycle, after a short
    /// idle sleep so callers can spin without burning CPU. Disconnection
    /// (EOF) and hard read faults surface as `Err`.
    pub fn poll_line(&mut self) -> Result<Option<String>, IoError> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }

        match self.port.bytes_to_read() {
            Ok(0) => {
                thread::sleep(self.idle_poll);
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) => return Err(IoError::read(&self.port_name, e.to_string())),
        }

        let mut buf = [0u8; 256];
        match self.port.read(&mut buf) {
            Ok(0) => {
                // Stream ended: hand out any buffered partial line before
                // surfacing the disconnect on the next poll.
                if let Some(line) = self.framer.flush() {
                    return Ok(Some(line));
                }
                Err(IoError::read(&self.port_name, "device disconnected (EOF)"))
            }
            Ok(n) => {
                for line in self.framer.feed(&buf[..n]) {
                    self.pending.push_back(line);
                }
                Ok(self.pending.pop_front())
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(IoError::read(&self.port_name, e.to_string())),
        }
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        // The handle itself closes when the Box drops; this only records it.
        debug!(port = %self.port_name, "serial session closed");
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// Information about an available serial port, for `--list-ports` output and
/// connect-failure guidance.
pub struct SerialPortSummary {
    pub name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// List available serial ports.
///
/// On macOS, /dev/tty.* devices are filtered out in favour of /dev/cu.*:
/// the cu (calling unit) devices are non-blocking and preferred for
/// outgoing connections, while tty devices block on open waiting for
/// carrier detect.
pub fn list_ports() -> Result<Vec<SerialPortSummary>, IoError> {
    let ports = serialport::available_ports()
        .map_err(|e| IoError::read("serial", format!("failed to enumerate ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    ("USB".to_string(), info.manufacturer, info.product)
                }
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None)
                }
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None),
                serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None),
            };
            SerialPortSummary {
                name: p.port_name,
                port_type,
                manufacturer,
                product,
            }
        })
        .collect())
}
