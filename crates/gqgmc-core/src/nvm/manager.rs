//! Fetching and committing the NVM configuration
//!
//! The device has no partial-update command. A commit erases the block,
//! rewrites all 256 bytes one `WCFG` at a time, then asks the firmware to
//! apply them with `CFGUPDATE`.

use tracing::{debug, error, info};

use super::fields::{ConfigField, SaveDataType, NVM_SIZE};
use super::image::ImageError;
use crate::device::DeviceHandle;
use crate::error::GmcError;
use crate::protocol::{commands, communicate, Command};

/// History address just past the initial date/time stamp
pub const DATA_SAVE_ADDRESS_RESET: u32 = 0x00_0010;

/// Read the full configuration block into the handle's image
///
/// On success the image is replaced and every dirty flag cleared. On failure
/// the previous image is kept and `ConfigReadFailed` recorded.
pub fn fetch(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    let cmd = Command::GetConfig;
    match communicate(dev, &cmd.to_bytes(), cmd.response_len()) {
        Some(data) => {
            let mut bytes = [0u8; NVM_SIZE];
            bytes.copy_from_slice(&data);
            dev.image.replace(bytes);
            debug!("fetched configuration from {}", dev.path);
            Ok(())
        }
        None => {
            error!("failed to read configuration from {}", dev.path);
            fail(dev, GmcError::ConfigReadFailed)
        }
    }
}

/// Update one field of the host-side image. No I/O.
pub fn write_field(dev: &mut DeviceHandle, field: ConfigField, value: u32) -> Result<(), ImageError> {
    dev.image.write_field(field, value)
}

/// Erase the device's configuration block
pub fn erase(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    let cmd = Command::EraseConfig;
    if communicate(dev, &cmd.to_bytes(), cmd.response_len()).is_none() {
        error!("failed to erase configuration on {}", dev.path);
        return fail(dev, GmcError::EraseFailed);
    }
    Ok(())
}

/// Write every byte of the image to the device, one acknowledged
/// `WCFG` per byte
///
/// Stops at the first missing acknowledgement. The device block is then
/// partially written.
pub fn load(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    let image = *dev.image.as_bytes();

    for (offset, value) in image.iter().enumerate() {
        let offset = offset as u8;
        let cmd = commands::write_config_byte(offset, *value);
        if communicate(dev, &cmd, 1).is_none() {
            error!(
                "configuration write stopped at offset {}; {} is partially written",
                offset, dev.path
            );
            return fail(dev, GmcError::WriteFailed { offset });
        }
    }

    debug!("wrote {} configuration bytes to {}", NVM_SIZE, dev.path);
    Ok(())
}

/// Tell the firmware to apply the newly written block
pub fn update(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    let cmd = Command::UpdateConfig;
    if communicate(dev, &cmd.to_bytes(), cmd.response_len()).is_none() {
        error!("failed to apply configuration on {}", dev.path);
        return fail(dev, GmcError::UpdateFailed);
    }
    Ok(())
}

/// Erase, load and update. Aborts at the first failing step.
///
/// Dirty flags are cleared only when all three steps succeed.
pub fn commit(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    let changed = dev.image.dirty_fields();

    erase(dev)?;
    load(dev)?;
    update(dev)?;

    dev.image.clear_dirty();
    info!("committed configuration to {} ({:?})", dev.path, changed);
    Ok(())
}

/// Current logging mode, from the image
///
/// Returns the raw byte when it is not a known mode.
pub fn save_data_type(dev: &DeviceHandle) -> Result<SaveDataType, u8> {
    let raw = dev.image.read_field(ConfigField::SaveDataType) as u8;
    SaveDataType::try_from(raw)
}

/// Set the logging mode in the image
pub fn set_save_data_type(dev: &mut DeviceHandle, kind: SaveDataType) -> Result<(), ImageError> {
    dev.image
        .write_field(ConfigField::SaveDataType, kind as u32)
}

/// History address the device will write its next sample to, from the image
pub fn data_save_address(dev: &DeviceHandle) -> u32 {
    dev.image.read_field(ConfigField::DataSaveAddress)
}

/// Point the history write address back at the start of the buffer
///
/// Takes effect on the device after [`commit`].
pub fn reset_data_save_address(dev: &mut DeviceHandle) -> Result<(), ImageError> {
    dev.image
        .write_field(ConfigField::DataSaveAddress, DATA_SAVE_ADDRESS_RESET)
}

fn fail(dev: &mut DeviceHandle, code: GmcError) -> Result<(), GmcError> {
    dev.errors.set(code.clone());
    Err(code)
}
