//! Device capability accessors
//!
//! One function per thing the counter can report or do. Each runs a single
//! exchange (or a short fixed sequence of them), decodes the response and
//! returns a fixed default when the exchange fails. The failure itself is
//! left on the handle's sticky error code.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, error, warn};

use crate::device::DeviceHandle;
use crate::error::GmcError;
use crate::protocol::commands::{self, ClockField};
use crate::protocol::{communicate, Command};

/// Largest history block one request may return
pub const HISTORY_DATA_MAX_SIZE: u32 = 0x1000;

/// Size of the device's history buffer; no request may reach past it
pub const HISTORY_ADDR_MAX_SIZE: u32 = 0x10000;

/// Returned by [`get_version`] when the read fails
pub const INVALID_VERSION: &str = "invalidinvalid";

/// Returned by [`get_serial_number`] when the read fails
pub const INVALID_SERIAL: &str = "00000000000000";

/// Counts-per-minute/second value from its two response bytes
///
/// The top two bits of the first byte are reserved and masked off.
pub fn decode_count(b0: u8, b1: u8) -> u16 {
    (u16::from(b0 & 0x3F) << 8) | u16::from(b1)
}

/// Serial number as lowercase hex, two characters per byte
pub fn decode_serial(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Battery voltage from its signed tenths-of-a-volt byte
pub fn decode_voltage(raw: u8) -> f32 {
    f32::from(raw as i8) / 10.0
}

/// Firmware version, e.g. `GMC-300Re 4.20`
pub fn get_version(dev: &mut DeviceHandle) -> String {
    let cmd = Command::GetVersion;
    match communicate(dev, &cmd.to_bytes(), cmd.response_len()) {
        Some(data) => {
            // one char per byte keeps the revision at chars 10..14
            let version: String = data.iter().map(|&b| char::from(b)).collect();
            debug!("version {:?}", version);
            version
        }
        None => {
            dev.errors.set(GmcError::VersionReadFailed);
            INVALID_VERSION.to_string()
        }
    }
}

/// Serial number as 14 lowercase hex characters
pub fn get_serial_number(dev: &mut DeviceHandle) -> String {
    let cmd = Command::GetSerial;
    match communicate(dev, &cmd.to_bytes(), cmd.response_len()) {
        Some(data) => decode_serial(&data),
        None => {
            dev.errors.set(GmcError::SerialReadFailed);
            INVALID_SERIAL.to_string()
        }
    }
}

fn get_count(dev: &mut DeviceHandle, cmd: Command, on_failure: GmcError) -> u16 {
    match communicate(dev, &cmd.to_bytes(), cmd.response_len()) {
        Some(data) => decode_count(data[0], data[1]),
        None => {
            dev.errors.set(on_failure);
            0
        }
    }
}

/// Counts per minute
pub fn get_cpm(dev: &mut DeviceHandle) -> u16 {
    get_count(dev, Command::GetCpm, GmcError::CpmReadFailed)
}

/// Counts per second
pub fn get_cps(dev: &mut DeviceHandle) -> u16 {
    get_count(dev, Command::GetCps, GmcError::CpsReadFailed)
}

/// Battery voltage in volts
pub fn get_battery_voltage(dev: &mut DeviceHandle) -> f32 {
    let cmd = Command::GetVoltage;
    match communicate(dev, &cmd.to_bytes(), cmd.response_len()) {
        Some(data) => decode_voltage(data[0]),
        None => {
            dev.errors.set(GmcError::VoltageReadFailed);
            0.0
        }
    }
}

/// A block of the device's history buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Start address, at most `HISTORY_ADDR_MAX_SIZE`
    pub address: u32,
    /// Bytes to read, at most `HISTORY_DATA_MAX_SIZE`
    pub length: u32,
}

impl HistoryRequest {
    /// Request `length` bytes starting at `address`
    pub fn new(address: u32, length: u32) -> Self {
        Self { address, length }
    }

    /// Check the request against the buffer bounds
    ///
    /// Reports the first violation in the order length, address, overrun.
    pub fn validate(&self) -> Result<(), GmcError> {
        if self.length > HISTORY_DATA_MAX_SIZE {
            return Err(GmcError::HistoryLengthTooLarge {
                length: self.length,
            });
        }
        if self.address > HISTORY_ADDR_MAX_SIZE {
            return Err(GmcError::HistoryAddressTooLarge {
                address: self.address,
            });
        }
        if self.address + self.length > HISTORY_ADDR_MAX_SIZE {
            return Err(GmcError::HistoryOverrun {
                address: self.address,
                length: self.length,
            });
        }
        Ok(())
    }
}

/// History bytes read from the device
///
/// Always backed by a zero-filled `HISTORY_DATA_MAX_SIZE` buffer; the first
/// `len()` bytes hold what the device returned.
#[derive(Clone, PartialEq, Eq)]
pub struct HistoryData {
    buffer: Box<[u8; HISTORY_DATA_MAX_SIZE as usize]>,
    len: usize,
}

impl HistoryData {
    fn zeroed() -> Self {
        Self {
            buffer: Box::new([0u8; HISTORY_DATA_MAX_SIZE as usize]),
            len: 0,
        }
    }

    /// Bytes the device returned
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// The whole buffer, including the zero tail
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[..]
    }

    /// Number of bytes the device returned
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing was read
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for HistoryData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryData").field("len", &self.len).finish()
    }
}

/// Read `length` bytes of history starting at `address`
///
/// An out-of-bounds request is rejected before anything is sent.
pub fn get_history_data(dev: &mut DeviceHandle, address: u32, length: u32) -> HistoryData {
    let mut data = HistoryData::zeroed();

    let request = HistoryRequest::new(address, length);
    if let Err(e) = request.validate() {
        warn!("rejected history request: {}", e);
        dev.errors.reset();
        dev.errors.set(e);
        return data;
    }

    let cmd = commands::history_read(address, length as u16);
    match communicate(dev, &cmd, length as usize) {
        Some(bytes) => {
            data.buffer[..bytes.len()].copy_from_slice(&bytes);
            data.len = bytes.len();
        }
        None => dev.errors.set(GmcError::HistoryReadFailed),
    }
    data
}

/// Power the counter off. The device sends nothing back.
pub fn turn_off_power(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    communicate(dev, &Command::PowerOff.to_bytes(), 0);
    dev.errors.as_result()
}

/// Front panel keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftKey {
    /// Back / left arrow
    LeftArrow,
    /// Up arrow
    UpArrow,
    /// Down arrow
    DownArrow,
    /// Enter / power
    Enter,
}

impl SoftKey {
    /// ASCII digit sent in `<KEY k>>`
    pub fn code(self) -> u8 {
        match self {
            SoftKey::LeftArrow => b'0',
            SoftKey::UpArrow => b'1',
            SoftKey::DownArrow => b'2',
            SoftKey::Enter => b'3',
        }
    }
}

/// Press a front panel key. The device sends nothing back.
pub fn send_key(dev: &mut DeviceHandle, key: SoftKey) -> Result<(), GmcError> {
    communicate(dev, &commands::key(key.code()), 0);
    dev.errors.as_result()
}

fn set_clock_fields(
    dev: &mut DeviceHandle,
    steps: [(ClockField, u8, GmcError); 3],
) -> Result<(), GmcError> {
    for (field, value, on_failure) in steps {
        if communicate(dev, &commands::set_clock(field, value), 1).is_none() {
            error!("{:?} = {} was not acknowledged by {}", field, value, dev.path);
            dev.errors.set(on_failure.clone());
            return Err(on_failure);
        }
    }
    Ok(())
}

/// Set the device's calendar date
///
/// Sends month, day and two-digit year, stopping at the first one the device
/// does not acknowledge.
pub fn set_date(dev: &mut DeviceHandle, date: NaiveDate) -> Result<(), GmcError> {
    set_clock_fields(
        dev,
        [
            (ClockField::Month, date.month() as u8, GmcError::SetMonthFailed),
            (ClockField::Day, date.day() as u8, GmcError::SetDayFailed),
            (
                ClockField::Year,
                date.year().rem_euclid(100) as u8,
                GmcError::SetYearFailed,
            ),
        ],
    )
}

/// Set the device's time of day
pub fn set_time(dev: &mut DeviceHandle, time: NaiveTime) -> Result<(), GmcError> {
    set_clock_fields(
        dev,
        [
            (ClockField::Hour, time.hour() as u8, GmcError::SetHourFailed),
            (ClockField::Minute, time.minute() as u8, GmcError::SetMinuteFailed),
            (ClockField::Second, time.second() as u8, GmcError::SetSecondFailed),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_count_masks_reserved_bits() {
        assert_eq!(decode_count(0xFF, 0xFF), 0x3FFF);
        assert_eq!(decode_count(0x00, 0x00), 0);
        assert_eq!(decode_count(0x40, 0x1C), 0x1C);
    }

    #[test]
    fn test_decode_serial() {
        let serial = decode_serial(&[0x00, 0x30, 0x00, 0xE3, 0x4A, 0x35, 0x1A]);
        assert_eq!(serial, "003000e34a351a");
        assert_eq!(INVALID_SERIAL.len(), serial.len());
    }

    #[test]
    fn test_decode_voltage() {
        assert_eq!(decode_voltage(42), 4.2);
        assert_eq!(decode_voltage(0xFF), -0.1);
    }

    #[test]
    fn test_history_request_bounds() {
        assert!(HistoryRequest::new(0, 4096).validate().is_ok());
        assert!(HistoryRequest::new(0xF000, 0x1000).validate().is_ok());
        assert!(HistoryRequest::new(0x10000, 0).validate().is_ok());

        assert_eq!(
            HistoryRequest::new(0, 4097).validate(),
            Err(GmcError::HistoryLengthTooLarge { length: 4097 })
        );
        assert_eq!(
            HistoryRequest::new(0x10001, 0).validate(),
            Err(GmcError::HistoryAddressTooLarge { address: 0x10001 })
        );
        assert_eq!(
            HistoryRequest::new(0xF001, 0x1000).validate(),
            Err(GmcError::HistoryOverrun {
                address: 0xF001,
                length: 0x1000
            })
        );
    }

    #[test]
    fn test_first_violation_wins() {
        assert_eq!(
            HistoryRequest::new(0x20000, 5000).validate(),
            Err(GmcError::HistoryLengthTooLarge { length: 5000 })
        );
    }

    #[test]
    fn test_soft_key_codes() {
        assert_eq!(SoftKey::LeftArrow.code(), b'0');
        assert_eq!(SoftKey::Enter.code(), b'3');
    }
}
