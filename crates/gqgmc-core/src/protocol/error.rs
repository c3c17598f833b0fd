//! Transport errors

use thiserror::Error;

/// Errors raised by the serial transport itself
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Transport closed")]
    Closed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for TransportError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => TransportError::PortNotFound(e.description),
            _ => TransportError::SerialError(e.to_string()),
        }
    }
}
