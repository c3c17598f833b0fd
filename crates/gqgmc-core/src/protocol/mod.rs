//! Serial Protocol Communication
//!
//! Implements the GQ GMC command/response protocol.
//!
//! The protocol has no envelope: commands are ASCII `<NAME>>` strings with
//! binary parameters spliced in before the `>>`, and responses are a fixed
//! number of raw bytes known only from the command that was sent. A read that
//! comes back short is the only failure signal the wire offers.

pub mod commands;
pub mod engine;
mod error;
pub mod serial;
pub mod stream;

pub use commands::Command;
pub use engine::{clear_input_buffer, communicate, read_response, send_command};
pub use error::TransportError;
pub use serial::{configure_port, open_port};
pub use stream::{SerialTransport, Transport};

/// Fixed baud rate of the GMC-300 USB serial bridge
pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Per-byte read timeout in milliseconds
pub const DEFAULT_BYTE_TIMEOUT_MS: u64 = 500;

/// Maximum bytes discarded while waiting for the input stream to go quiet
pub const CLEAR_MAX_TRIES: usize = 10;
