//! Protocol commands
//!
//! Defines the commands understood by GMC-300 firmware 2.23 and later.
//!
//! Every command is `<NAME>>`. Commands that carry data splice the raw
//! parameter bytes in between the name and the closing `>>`, with no length
//! prefix and no checksum.

use serde::{Deserialize, Serialize};

/// Opening byte of every command
pub const COMMAND_START: u8 = b'<';

/// Closing sentinel of every command
pub const COMMAND_END: &[u8] = b">>";

/// Fixed (parameterless) protocol commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Firmware version, 14 ASCII bytes
    GetVersion,
    /// Serial number, 7 raw bytes
    GetSerial,
    /// Counts per minute, 2 bytes
    GetCpm,
    /// Counts per second, 2 bytes
    GetCps,
    /// Battery voltage, 1 byte in tenths of a volt
    GetVoltage,
    /// Full NVM configuration, 256 bytes
    GetConfig,
    /// Erase NVM configuration, 1-byte ack
    EraseConfig,
    /// Apply the rewritten NVM configuration, 1-byte ack
    UpdateConfig,
    /// Start pushing a CPS sample every second
    HeartbeatOn,
    /// Stop pushing CPS samples
    HeartbeatOff,
    /// Power the counter off
    PowerOff,
}

impl Command {
    /// Command name between `<` and `>>`
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetVersion => "GETVER",
            Command::GetSerial => "GETSERIAL",
            Command::GetCpm => "GETCPM",
            Command::GetCps => "GETCPS",
            Command::GetVoltage => "GETVOLT",
            Command::GetConfig => "GETCFG",
            Command::EraseConfig => "ECFG",
            Command::UpdateConfig => "CFGUPDATE",
            Command::HeartbeatOn => "HEARTBEAT1",
            Command::HeartbeatOff => "HEARTBEAT0",
            Command::PowerOff => "POWEROFF",
        }
    }

    /// Number of bytes the counter sends back (0 when it sends nothing)
    pub fn response_len(&self) -> usize {
        match self {
            Command::GetVersion => 14,
            Command::GetSerial => 7,
            Command::GetCpm | Command::GetCps => 2,
            Command::GetVoltage => 1,
            Command::GetConfig => 256,
            Command::EraseConfig | Command::UpdateConfig => 1,
            Command::HeartbeatOn | Command::HeartbeatOff | Command::PowerOff => 0,
        }
    }

    /// Encoded command bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        frame(self.name(), &[])
    }
}

/// Frame `name` and its binary parameters as `<NAME params>>`
pub fn frame(name: &str, params: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + name.len() + params.len() + COMMAND_END.len());
    bytes.push(COMMAND_START);
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(params);
    bytes.extend_from_slice(COMMAND_END);
    bytes
}

/// `<SPIR a2 a1 a0 lL lH>>`: read `length` history bytes starting at `address`
///
/// The address goes out as three big-endian bytes. The length goes out low
/// byte first, which is what the counter expects.
pub fn history_read(address: u32, length: u16) -> Vec<u8> {
    let params = [
        (address >> 16) as u8,
        (address >> 8) as u8,
        address as u8,
        length as u8,
        (length >> 8) as u8,
    ];
    frame("SPIR", &params)
}

/// `<WCFG offset value>>`: write one NVM configuration byte
pub fn write_config_byte(offset: u8, value: u8) -> Vec<u8> {
    frame("WCFG", &[offset, value])
}

/// `<KEY k>>`: press one of the four front panel keys
pub fn key(code: u8) -> Vec<u8> {
    frame("KEY", &[code])
}

/// Clock fields settable one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockField {
    /// Two-digit year
    Year,
    /// Month, 1-12
    Month,
    /// Day of month
    Day,
    /// Hour, 0-23
    Hour,
    /// Minute
    Minute,
    /// Second
    Second,
}

impl ClockField {
    fn name(&self) -> &'static str {
        match self {
            ClockField::Year => "SETDATEYY",
            ClockField::Month => "SETDATEMM",
            ClockField::Day => "SETDATEDD",
            ClockField::Hour => "SETTIMEHH",
            ClockField::Minute => "SETTIMEMM",
            ClockField::Second => "SETTIMESS",
        }
    }
}

/// `<SETDATEYY v>>` and friends, each acknowledged with one byte
pub fn set_clock(field: ClockField, value: u8) -> Vec<u8> {
    frame(field.name(), &[value])
}
