//! NVM configuration field table
//!
//! Offsets and widths of the 30 named parameters in the counter's 256-byte
//! configuration block. Multi-byte fields are stored big-endian.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the NVM configuration block
pub const NVM_SIZE: usize = 256;

/// Number of meaningful bytes at the start of the block
pub const NVM_USED: usize = 59;

/// A named parameter in the configuration block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigField {
    PowerOnOff,
    AlarmOnOff,
    SpeakerOnOff,
    GraphicModeOnOff,
    BacklightTimeoutSeconds,
    IdleTitleDisplayMode,
    AlarmCpmValue,
    CalibrationCpm0,
    CalibrationSvUc0,
    CalibrationCpm1,
    CalibrationSvUc1,
    CalibrationCpm2,
    CalibrationSvUc2,
    IdleDisplayMode,
    AlarmValueSvUc,
    AlarmType,
    /// Logging interval and sample kind, see [`SaveDataType`]
    SaveDataType,
    SwivelDisplay,
    Zoom,
    /// History address of the first sample after the latest timestamp or label
    DataSaveAddress,
    DataReadAddress,
    PowerSavingMode,
    SensitivityMode,
    CounterDelay,
    VoltageOffset,
    MaxCpm,
    SensitivityAutoModeThreshold,
    /// Year, month, day of the current logging run
    SaveDate,
    /// Hour, minute, second of the current logging run
    SaveTime,
    /// Always 0xFF
    MaxBytes,
}

/// Location of a field inside the block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Byte offset of the most significant byte
    pub offset: usize,
    /// Width in bytes (1 to 4)
    pub width: usize,
}

impl ConfigField {
    /// Every field, in offset order
    pub const ALL: [ConfigField; 30] = [
        ConfigField::PowerOnOff,
        ConfigField::AlarmOnOff,
        ConfigField::SpeakerOnOff,
        ConfigField::GraphicModeOnOff,
        ConfigField::BacklightTimeoutSeconds,
        ConfigField::IdleTitleDisplayMode,
        ConfigField::AlarmCpmValue,
        ConfigField::CalibrationCpm0,
        ConfigField::CalibrationSvUc0,
        ConfigField::CalibrationCpm1,
        ConfigField::CalibrationSvUc1,
        ConfigField::CalibrationCpm2,
        ConfigField::CalibrationSvUc2,
        ConfigField::IdleDisplayMode,
        ConfigField::AlarmValueSvUc,
        ConfigField::AlarmType,
        ConfigField::SaveDataType,
        ConfigField::SwivelDisplay,
        ConfigField::Zoom,
        ConfigField::DataSaveAddress,
        ConfigField::DataReadAddress,
        ConfigField::PowerSavingMode,
        ConfigField::SensitivityMode,
        ConfigField::CounterDelay,
        ConfigField::VoltageOffset,
        ConfigField::MaxCpm,
        ConfigField::SensitivityAutoModeThreshold,
        ConfigField::SaveDate,
        ConfigField::SaveTime,
        ConfigField::MaxBytes,
    ];

    /// Offset and width of this field
    pub const fn layout(self) -> FieldLayout {
        let (offset, width) = match self {
            ConfigField::PowerOnOff => (0, 1),
            ConfigField::AlarmOnOff => (1, 1),
            ConfigField::SpeakerOnOff => (2, 1),
            ConfigField::GraphicModeOnOff => (3, 1),
            ConfigField::BacklightTimeoutSeconds => (4, 1),
            ConfigField::IdleTitleDisplayMode => (5, 1),
            ConfigField::AlarmCpmValue => (6, 2),
            ConfigField::CalibrationCpm0 => (8, 2),
            ConfigField::CalibrationSvUc0 => (10, 4),
            ConfigField::CalibrationCpm1 => (14, 2),
            ConfigField::CalibrationSvUc1 => (16, 4),
            ConfigField::CalibrationCpm2 => (20, 2),
            ConfigField::CalibrationSvUc2 => (22, 4),
            ConfigField::IdleDisplayMode => (26, 1),
            ConfigField::AlarmValueSvUc => (27, 4),
            ConfigField::AlarmType => (31, 1),
            ConfigField::SaveDataType => (32, 1),
            ConfigField::SwivelDisplay => (33, 1),
            ConfigField::Zoom => (34, 4),
            ConfigField::DataSaveAddress => (38, 3),
            ConfigField::DataReadAddress => (41, 3),
            ConfigField::PowerSavingMode => (44, 1),
            ConfigField::SensitivityMode => (45, 1),
            ConfigField::CounterDelay => (46, 2),
            ConfigField::VoltageOffset => (48, 1),
            ConfigField::MaxCpm => (49, 2),
            ConfigField::SensitivityAutoModeThreshold => (51, 1),
            ConfigField::SaveDate => (52, 3),
            ConfigField::SaveTime => (55, 3),
            ConfigField::MaxBytes => (58, 1),
        };
        FieldLayout { offset, width }
    }

    /// Byte offset of this field
    pub const fn offset(self) -> usize {
        self.layout().offset
    }

    /// Width of this field in bytes
    pub const fn width(self) -> usize {
        self.layout().width
    }

    /// Largest value the field can hold
    pub fn max_value(self) -> u32 {
        match self.width() {
            4 => u32::MAX,
            w => (1u32 << (8 * w)) - 1,
        }
    }

    /// Field containing byte `offset`, if any
    pub fn at_offset(offset: usize) -> Option<ConfigField> {
        Self::ALL.iter().copied().find(|f| {
            let layout = f.layout();
            offset >= layout.offset && offset < layout.offset + layout.width
        })
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the counter logs into its history buffer, and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveDataType {
    /// Logging off
    Off = 0,
    /// Counts per second, every second
    Cps = 1,
    /// Counts per minute, every minute
    Cpm = 2,
    /// CPM averaged over an hour, every hour
    Cph = 3,
}

impl TryFrom<u8> for SaveDataType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SaveDataType::Off),
            1 => Ok(SaveDataType::Cps),
            2 => Ok(SaveDataType::Cpm),
            3 => Ok(SaveDataType::Cph),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_contiguous() {
        let mut next = 0;
        for field in ConfigField::ALL {
            let layout = field.layout();
            assert_eq!(layout.offset, next, "{field} does not start where the previous field ended");
            assert!((1..=4).contains(&layout.width));
            next = layout.offset + layout.width;
        }
        assert_eq!(next, NVM_USED);
    }

    #[test]
    fn test_at_offset() {
        assert_eq!(ConfigField::at_offset(0), Some(ConfigField::PowerOnOff));
        assert_eq!(ConfigField::at_offset(40), Some(ConfigField::DataSaveAddress));
        assert_eq!(ConfigField::at_offset(58), Some(ConfigField::MaxBytes));
        assert_eq!(ConfigField::at_offset(59), None);
    }

    #[test]
    fn test_max_value() {
        assert_eq!(ConfigField::PowerOnOff.max_value(), 0xFF);
        assert_eq!(ConfigField::AlarmCpmValue.max_value(), 0xFFFF);
        assert_eq!(ConfigField::DataSaveAddress.max_value(), 0xFF_FFFF);
        assert_eq!(ConfigField::Zoom.max_value(), u32::MAX);
    }

    #[test]
    fn test_save_data_type_conversion() {
        assert_eq!(SaveDataType::try_from(2), Ok(SaveDataType::Cpm));
        assert_eq!(SaveDataType::try_from(7), Err(7));
    }
}
