//! Device handle
//!
//! Owns the transport, the NVM shadow image and the sticky error state for
//! one counter. All protocol operations take the handle by `&mut`, so one
//! handle always has exactly one caller.

use std::time::Duration;
use tracing::{info, warn};

use crate::capability;
use crate::config::DeviceConfig;
use crate::error::{ErrorState, GmcError};
use crate::nvm::{self, ConfigImage};
use crate::protocol::{SerialTransport, Transport, CLEAR_MAX_TRIES};

/// Oldest firmware revision known to support every command
pub const NEW_FIRMWARE_REVISION: f32 = 2.23;

/// An open connection to one counter
pub struct DeviceHandle {
    pub(crate) path: String,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) errors: ErrorState,
    pub(crate) image: ConfigImage,
    pub(crate) firmware_revision: Option<f32>,
    pub(crate) streaming: bool,
    pub(crate) clear_max_tries: usize,
}

impl DeviceHandle {
    /// Open the serial port named in `config` and run the startup sequence
    ///
    /// Fails only if `config` is invalid or the port cannot be opened or
    /// configured. Everything after that (version read, firmware check,
    /// configuration fetch) is reported through [`DeviceHandle::error`].
    pub fn open(config: &DeviceConfig) -> Result<Self, GmcError> {
        config.validate().map_err(|e| {
            warn!("refusing to open {}: {}", config.port, e);
            GmcError::OpenFailed {
                path: config.port.clone(),
                reason: e.to_string(),
            }
        })?;

        let transport = SerialTransport::open(
            &config.port,
            config.baud_rate,
            Duration::from_millis(config.byte_timeout_ms),
        )
        .map_err(|e| {
            warn!("failed to open {}: {}", config.port, e);
            GmcError::OpenFailed {
                path: config.port.clone(),
                reason: e.to_string(),
            }
        })?;

        info!("opened {} at {} baud", config.port, config.baud_rate);

        let mut dev = Self::from_transport(&config.port, Box::new(transport));
        dev.clear_max_tries = config.clear_max_tries;
        dev.startup();
        Ok(dev)
    }

    /// Wrap an already open transport and run the startup sequence
    pub fn attach(path: &str, transport: Box<dyn Transport>) -> Self {
        let mut dev = Self::from_transport(path, transport);
        dev.startup();
        dev
    }

    /// Wrap an already open transport without talking to the device
    ///
    /// The image starts all zero. Call [`nvm::fetch`] before committing, or
    /// the commit overwrites the device's settings with zeros.
    pub fn from_transport(path: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            path: path.to_string(),
            transport,
            errors: ErrorState::new(),
            image: ConfigImage::new(),
            firmware_revision: None,
            streaming: false,
            clear_max_tries: CLEAR_MAX_TRIES,
        }
    }

    /// Read the version, check the firmware revision and fetch the NVM image
    fn startup(&mut self) {
        let version = capability::get_version(self);
        if !self.errors.read_ok() {
            return;
        }

        self.firmware_revision = parse_firmware_revision(&version);
        let older = match self.firmware_revision {
            Some(revision) if revision < NEW_FIRMWARE_REVISION => {
                warn!("{} reports firmware {:.2}; some commands may not work", self.path, revision);
                Some(revision)
            }
            Some(_) => None,
            None => {
                warn!("could not parse a firmware revision from {:?}", version);
                None
            }
        };

        if nvm::fetch(self).is_err() {
            return;
        }

        if let Some(revision) = older {
            self.errors.set(GmcError::OlderFirmware { revision });
        }
    }

    /// Device path this handle was opened on
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sticky error code of the last operation (`None` means no problem)
    pub fn error(&self) -> Option<&GmcError> {
        self.errors.code()
    }

    /// Full error state, including the last read outcome
    pub fn errors(&self) -> &ErrorState {
        &self.errors
    }

    /// Host-side shadow of the device's NVM configuration
    pub fn image(&self) -> &ConfigImage {
        &self.image
    }

    /// Firmware revision parsed from the version string at startup
    pub fn firmware_revision(&self) -> Option<f32> {
        self.firmware_revision
    }

    /// Whether the firmware predates the current command set
    pub fn is_older_firmware(&self) -> bool {
        self.firmware_revision
            .map(|r| r < NEW_FIRMWARE_REVISION)
            .unwrap_or(false)
    }

    /// Whether heartbeat (streaming CPS) mode is on
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Change the per-byte read timeout
    pub fn set_byte_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.transport.set_byte_timeout(timeout)
    }

    /// Close the transport
    pub fn close(mut self) {
        self.transport.close();
        info!("closed {}", self.path);
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("path", &self.path)
            .field("errors", &self.errors)
            .field("firmware_revision", &self.firmware_revision)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}

/// Revision number from characters 10..14 of the version, e.g. `GMC-300Re 4.20`
pub fn parse_firmware_revision(version: &str) -> Option<f32> {
    let revision: String = version.chars().skip(10).take(4).collect();
    revision.trim().parse::<f32>().ok()
}
