//! # GQ GMC Core Library
//!
//! Host-side driver for GQ Electronics GMC-300 series Geiger-Muller counters.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial transport with a per-byte read timeout
//! - The envelope-less command/response protocol engine
//! - One accessor per device capability (version, serial, CPM, CPS, voltage, history)
//! - A shadow image of the 256-byte NVM configuration and its commit sequence
//! - Heartbeat (streaming CPS) mode
//! - A simulated counter for running everything without hardware
//!
//! Device failures never panic or return early through `?`. Every exchange
//! resets a sticky error code on the [`DeviceHandle`]; accessors return a
//! fixed default value and leave the code for the caller to inspect.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gqgmc_core::prelude::*;
//!
//! let mut gmc = DeviceHandle::open(&DeviceConfig::for_port("/dev/ttyUSB0"))?;
//!
//! let cpm = capability::get_cpm(&mut gmc);
//! if let Some(err) = gmc.error() {
//!     eprintln!("{err}");
//! }
//!
//! nvm::set_save_data_type(&mut gmc, SaveDataType::Cpm)?;
//! nvm::reset_data_save_address(&mut gmc)?;
//! nvm::commit(&mut gmc)?;
//! ```

pub mod capability;
pub mod config;
pub mod demo;
pub mod device;
pub mod error;
pub mod nvm;
pub mod protocol;
pub mod streaming;

pub use config::DeviceConfig;
pub use device::DeviceHandle;
pub use error::{ErrorState, GmcError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::capability::{self, HistoryData, HistoryRequest, SoftKey};
    pub use crate::config::DeviceConfig;
    pub use crate::demo::SimulatedCounter;
    pub use crate::device::DeviceHandle;
    pub use crate::error::{ErrorState, GmcError};
    pub use crate::nvm::{self, ConfigField, ConfigImage, SaveDataType};
    pub use crate::protocol::{Transport, TransportError};
    pub use crate::streaming;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
