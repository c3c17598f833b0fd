//! Byte channels to the counter

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::debug;

use super::serial::{configure_port, open_port};
use super::TransportError;

/// Abstraction over the byte channel to the counter
pub trait Transport: Send {
    /// Write every byte of `data`
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read a single byte, waiting at most one byte timeout.
    /// Returns `Ok(None)` when the timeout expires with nothing received.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Change the per-byte read timeout
    fn set_byte_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Release the underlying channel. Further I/O fails.
    fn close(&mut self) {}
}

/// Serial port wrapper implementing Transport
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port: Some(port) }
    }

    /// Open and configure `path` at `baud_rate` with the given byte timeout
    pub fn open(path: &str, baud_rate: u32, byte_timeout: Duration) -> Result<Self, TransportError> {
        let mut port = open_port(path, Some(baud_rate), Some(byte_timeout))?;
        configure_port(port.as_mut(), byte_timeout)?;
        debug!(path, baud_rate, timeout_ms = byte_timeout.as_millis() as u64, "serial port configured");
        Ok(Self::new(port))
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, TransportError::Closed))
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let port = self.port()?;
        let mut buf = [0u8; 1];
        match port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn set_byte_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port()?
            .set_timeout(timeout)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn close(&mut self) {
        self.port = None;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serialport::TTYPort;

    fn pty_pair() -> (TTYPort, SerialTransport) {
        let (master, slave) = TTYPort::pair().expect("Unable to create ptty pair");
        let mut transport = SerialTransport::new(Box::new(slave));
        transport
            .set_byte_timeout(Duration::from_millis(20))
            .expect("set timeout");
        (master, transport)
    }

    #[test]
    fn test_read_byte_times_out_on_silence() {
        let (_master, mut transport) = pty_pair();
        assert_eq!(transport.read_byte().unwrap(), None);
    }

    #[test]
    fn test_write_then_read_across_pty() {
        let (mut master, mut transport) = pty_pair();
        transport.write_all(b"<GETCPM>>").unwrap();

        let mut buf = [0u8; 9];
        master.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"<GETCPM>>");

        master.write_all(&[0x00, 0x1C]).unwrap();
        assert_eq!(transport.read_byte().unwrap(), Some(0x00));
        assert_eq!(transport.read_byte().unwrap(), Some(0x1C));
    }

    #[test]
    fn test_closed_transport_rejects_io() {
        let (_master, mut transport) = pty_pair();
        transport.close();
        assert!(transport.write_all(b"<GETVER>>").is_err());
        assert!(transport.read_byte().is_err());
    }
}
