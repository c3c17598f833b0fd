//! Serial port handling
//!
//! Provides low-level serial port access for the counter's USB serial bridge.

use serialport::SerialPort;
use std::time::Duration;

use super::{TransportError, DEFAULT_BAUD_RATE, DEFAULT_BYTE_TIMEOUT_MS};

/// Open a serial port
///
/// The port comes up in raw mode (no line editing, no character
/// translation). `byte_timeout` bounds every single-byte read; there is no
/// minimum byte count, so a silent device costs at most one timeout per byte
/// requested.
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    byte_timeout: Option<Duration>,
) -> Result<Box<dyn SerialPort>, TransportError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    let timeout = byte_timeout.unwrap_or(Duration::from_millis(DEFAULT_BYTE_TIMEOUT_MS));

    serialport::new(name, baud)
        .timeout(timeout)
        .open()
        .map_err(TransportError::from)
}

/// Configure a serial port for counter communication
pub fn configure_port(port: &mut dyn SerialPort, byte_timeout: Duration) -> Result<(), TransportError> {
    // 8N1, no flow control
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;
    port.set_timeout(byte_timeout)?;
    Ok(())
}
