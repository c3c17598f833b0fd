//! NVM configuration management
//!
//! - `fields`: the offset/width table of the 30 named parameters
//! - `image`: the host-side 256-byte shadow with dirty tracking
//! - `manager`: fetch, erase, load, update and commit against the device

mod fields;
mod image;
mod manager;

pub use fields::{ConfigField, FieldLayout, SaveDataType, NVM_SIZE, NVM_USED};
pub use image::{ConfigImage, ImageError};
pub use manager::{
    commit, data_save_address, erase, fetch, load, reset_data_save_address, save_data_type,
    set_save_data_type, update, write_field, DATA_SAVE_ADDRESS_RESET,
};
