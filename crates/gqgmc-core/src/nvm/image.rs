//! Host-side shadow of the NVM configuration block
//!
//! Field writes only touch this image. Dirty bytes are tracked so callers
//! can see what a commit would change on the device.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{trace, warn};

use super::fields::{ConfigField, NVM_SIZE};

/// Errors editing a [`ConfigImage`]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageError {
    #[error("Value {value:#x} does not fit in the {width}-byte field {field}")]
    ValueTooWide {
        field: ConfigField,
        value: u32,
        width: usize,
    },

    #[error("Field {field} is {expected} bytes wide, got {actual} bytes")]
    WidthMismatch {
        field: ConfigField,
        expected: usize,
        actual: usize,
    },

    #[error("Bytes {offset}..{} are outside the configuration block", .offset + .width)]
    OutOfBounds { offset: usize, width: usize },

    #[error("Configuration block must be 256 bytes, got {0}")]
    WrongSize(usize),
}

/// 256-byte NVM configuration image with dirty tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigImage {
    bytes: [u8; NVM_SIZE],
    /// Byte offsets written since the last fetch or commit
    dirty: BTreeSet<usize>,
}

impl ConfigImage {
    /// All-zero image with nothing dirty
    pub fn new() -> Self {
        Self {
            bytes: [0u8; NVM_SIZE],
            dirty: BTreeSet::new(),
        }
    }

    /// Image holding a copy of `data`, which must be exactly 256 bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, ImageError> {
        let bytes: [u8; NVM_SIZE] = data
            .try_into()
            .map_err(|_| ImageError::WrongSize(data.len()))?;
        Ok(Self {
            bytes,
            dirty: BTreeSet::new(),
        })
    }

    /// Replace the whole image with a fresh device read
    pub(crate) fn replace(&mut self, bytes: [u8; NVM_SIZE]) {
        self.bytes = bytes;
        self.dirty.clear();
    }

    /// The raw block, in device order
    pub fn as_bytes(&self) -> &[u8; NVM_SIZE] {
        &self.bytes
    }

    /// A single byte of the block
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    fn slot(&self, field: ConfigField) -> Result<&[u8], ImageError> {
        let layout = field.layout();
        self.bytes
            .get(layout.offset..layout.offset + layout.width)
            .ok_or(ImageError::OutOfBounds {
                offset: layout.offset,
                width: layout.width,
            })
    }

    fn slot_mut(&mut self, field: ConfigField) -> Result<&mut [u8], ImageError> {
        let layout = field.layout();
        self.bytes
            .get_mut(layout.offset..layout.offset + layout.width)
            .ok_or(ImageError::OutOfBounds {
                offset: layout.offset,
                width: layout.width,
            })
    }

    /// Raw bytes of `field`, most significant first
    pub fn field_bytes(&self, field: ConfigField) -> Result<&[u8], ImageError> {
        self.slot(field)
    }

    /// Value of `field`, decoded big-endian
    pub fn read_field(&self, field: ConfigField) -> u32 {
        match self.slot(field) {
            Ok(bytes) => BigEndian::read_uint(bytes, bytes.len()) as u32,
            Err(e) => {
                warn!("{}", e);
                0
            }
        }
    }

    /// Store `value` into `field`, big-endian, and mark it dirty
    pub fn write_field(&mut self, field: ConfigField, value: u32) -> Result<(), ImageError> {
        if value > field.max_value() {
            return Err(ImageError::ValueTooWide {
                field,
                value,
                width: field.width(),
            });
        }

        let slot = self.slot_mut(field)?;
        let width = slot.len();
        BigEndian::write_uint(slot, u64::from(value), width);

        trace!("{} = {:#x}", field, value);
        self.mark_dirty(field);
        Ok(())
    }

    /// Store raw bytes into `field` verbatim, most significant first
    pub fn write_field_bytes(&mut self, field: ConfigField, data: &[u8]) -> Result<(), ImageError> {
        let slot = self.slot_mut(field)?;
        if slot.len() != data.len() {
            return Err(ImageError::WidthMismatch {
                field,
                expected: slot.len(),
                actual: data.len(),
            });
        }
        slot.copy_from_slice(data);
        self.mark_dirty(field);
        Ok(())
    }

    fn mark_dirty(&mut self, field: ConfigField) {
        let layout = field.layout();
        self.dirty.extend(layout.offset..layout.offset + layout.width);
    }

    /// Whether any field was written since the last fetch or commit
    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Count of dirty bytes
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Fields with at least one dirty byte, in offset order
    pub fn dirty_fields(&self) -> Vec<ConfigField> {
        let mut fields: Vec<ConfigField> = self
            .dirty
            .iter()
            .filter_map(|&offset| ConfigField::at_offset(offset))
            .collect();
        fields.dedup();
        fields
    }

    /// Clear all dirty flags
    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

impl Default for ConfigImage {
    fn default() -> Self {
        Self::new()
    }
}
