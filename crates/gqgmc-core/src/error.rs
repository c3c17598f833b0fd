//! Device error codes
//!
//! The counter never reports errors itself. Every failure is inferred on the
//! host, almost always from a response that came back short, and recorded as
//! one sticky code on the device handle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::{HISTORY_ADDR_MAX_SIZE, HISTORY_DATA_MAX_SIZE};

/// Errors recorded against a device handle
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GmcError {
    #[error("Serial port {path} did not open: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Counter firmware {revision:.2} is older than 2.23; some commands may not work")]
    OlderFirmware { revision: f32 },

    #[error("Short response: expected {expected} bytes, received {received}")]
    ReadIncomplete { expected: usize, received: usize },

    #[error("Failed to read the firmware version")]
    VersionReadFailed,

    #[error("Failed to read the serial number")]
    SerialReadFailed,

    #[error("Failed to read counts per minute")]
    CpmReadFailed,

    #[error("Failed to read counts per second")]
    CpsReadFailed,

    #[error("Failed to read a heartbeat counts per second sample")]
    AutoCpsReadFailed,

    #[error("Failed to read the battery voltage")]
    VoltageReadFailed,

    #[error("Failed to read history data")]
    HistoryReadFailed,

    #[error("History length {length} exceeds {} bytes", HISTORY_DATA_MAX_SIZE)]
    HistoryLengthTooLarge { length: u32 },

    #[error("History address {address:#x} exceeds {:#x}", HISTORY_ADDR_MAX_SIZE)]
    HistoryAddressTooLarge { address: u32 },

    #[error(
        "History address {address:#x} plus length {length} exceeds {:#x}",
        HISTORY_ADDR_MAX_SIZE
    )]
    HistoryOverrun { address: u32, length: u32 },

    #[error("Failed to read configuration data")]
    ConfigReadFailed,

    #[error("Failed to erase configuration data")]
    EraseFailed,

    #[error("Failed to write configuration byte at offset {offset}")]
    WriteFailed { offset: u8 },

    #[error("Failed to apply configuration update")]
    UpdateFailed,

    #[error("Input buffer did not go quiet; power cycle the counter if this persists")]
    ClearFailed,

    #[error("Set year command failed")]
    SetYearFailed,

    #[error("Set month command failed")]
    SetMonthFailed,

    #[error("Set day command failed")]
    SetDayFailed,

    #[error("Set hour command failed")]
    SetHourFailed,

    #[error("Set minute command failed")]
    SetMinuteFailed,

    #[error("Set second command failed")]
    SetSecondFailed,
}

impl GmcError {
    /// Whether the condition is informational and the handle remains fully usable
    pub fn is_advisory(&self) -> bool {
        matches!(self, GmcError::OlderFirmware { .. } | GmcError::ClearFailed)
    }
}

/// Sticky error code plus the outcome of the last read
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorState {
    code: Option<GmcError>,
    read_ok: bool,
}

impl ErrorState {
    /// Baseline state: no problem, last read good
    pub fn new() -> Self {
        Self {
            code: None,
            read_ok: true,
        }
    }

    /// Return to baseline. Called at the start of every exchange.
    pub fn reset(&mut self) {
        self.code = None;
        self.read_ok = true;
    }

    /// Record an error, replacing whatever was recorded before
    pub fn set(&mut self, code: GmcError) {
        self.code = Some(code);
    }

    /// Current sticky code (`None` means no problem)
    pub fn code(&self) -> Option<&GmcError> {
        self.code.as_ref()
    }

    /// Whether the last read collected every expected byte
    pub fn read_ok(&self) -> bool {
        self.read_ok
    }

    pub(crate) fn mark_read(&mut self, ok: bool) {
        self.read_ok = ok;
    }

    /// Mirror the sticky code as a `Result`
    pub fn as_result(&self) -> Result<(), GmcError> {
        match &self.code {
            Some(code) if !code.is_advisory() => Err(code.clone()),
            _ => Ok(()),
        }
    }
}

impl Default for ErrorState {
    fn default() -> Self {
        Self::new()
    }
}
