//! Demo Mode - simulated GMC-300 for running without hardware
//!
//! `SimulatedCounter` implements [`Transport`] and answers the full command
//! set the way a GMC-300 with firmware 4.20 does. It is a cheap handle: clone
//! it, give one clone to a [`DeviceHandle`](crate::DeviceHandle) and keep the
//! other to inspect what was sent or to inject faults.
//!
//! There is no clock. Time advances only when the host reads an empty line,
//! which is when a heartbeat sample "arrives".

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

use crate::capability::HISTORY_ADDR_MAX_SIZE;
use crate::nvm::{ConfigField, NVM_SIZE};
use crate::protocol::commands::{COMMAND_END, COMMAND_START};
use crate::protocol::Transport;

const DEFAULT_SEED: u64 = 0x6D6D_300;
const DEFAULT_VERSION: &str = "GMC-300Re 4.20";
const DEFAULT_SERIAL: [u8; 7] = [0x00, 0x30, 0x00, 0xE3, 0x4A, 0x35, 0x1A];
const ACK: u8 = 0xAA;

/// Simulated counter, shared between clones
#[derive(Clone)]
pub struct SimulatedCounter {
    state: Arc<Mutex<State>>,
}

struct State {
    rng: StdRng,
    version: Vec<u8>,
    serial: [u8; 7],
    /// Fixed readings; random when unset
    cpm: Option<u16>,
    cps: Option<u16>,
    voltage: u8,
    history: Vec<u8>,
    nvm: [u8; NVM_SIZE],
    /// WCFG commands seen since the last ECFG
    writes_since_erase: usize,
    heartbeat: bool,
    powered: bool,
    closed: bool,
    keys: Vec<u8>,
    /// YY, MM, DD, HH, MM, SS
    clock: [u8; 6],
    /// Bytes waiting to be read by the host
    pending: VecDeque<u8>,
    commands: Vec<Vec<u8>>,
    timeouts: usize,
    silent: bool,
    truncate: Option<usize>,
    fail_write_at: Option<usize>,
}

impl Default for SimulatedCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCounter {
    /// A powered-on counter with factory-like settings and a fixed seed
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Same as [`SimulatedCounter::new`] with a different random seed
    pub fn with_seed(seed: u64) -> Self {
        let mut nvm = [0u8; NVM_SIZE];
        nvm[ConfigField::BacklightTimeoutSeconds.offset()] = 30;
        nvm[ConfigField::AlarmCpmValue.offset() + 1] = 100;
        nvm[ConfigField::SaveDataType.offset()] = 1;
        nvm[ConfigField::DataSaveAddress.offset() + 2] = 0x10;
        nvm[ConfigField::MaxBytes.offset()] = 0xFF;

        let state = State {
            rng: StdRng::seed_from_u64(seed),
            version: DEFAULT_VERSION.as_bytes().to_vec(),
            serial: DEFAULT_SERIAL,
            cpm: None,
            cps: None,
            voltage: 42,
            history: vec![0u8; HISTORY_ADDR_MAX_SIZE as usize],
            nvm,
            writes_since_erase: 0,
            heartbeat: false,
            powered: true,
            closed: false,
            keys: Vec::new(),
            clock: [0; 6],
            pending: VecDeque::new(),
            commands: Vec::new(),
            timeouts: 0,
            silent: false,
            truncate: None,
            fail_write_at: None,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Version string reported by `GETVER` (padded or cut to 14 bytes)
    pub fn set_version(&self, version: &str) {
        self.set_version_bytes(version.as_bytes());
    }

    /// Raw `GETVER` bytes, for firmware that sends non-ASCII
    pub fn set_version_bytes(&self, version: &[u8]) {
        self.state().version = version.to_vec();
    }

    /// Serial number reported by `GETSERIAL`
    pub fn set_serial(&self, serial: [u8; 7]) {
        self.state().serial = serial;
    }

    /// Fix the CPM reading
    pub fn set_cpm(&self, cpm: u16) {
        self.state().cpm = Some(cpm);
    }

    /// Fix the CPS reading (also used for heartbeat samples)
    pub fn set_cps(&self, cps: u16) {
        self.state().cps = Some(cps);
    }

    /// Raw battery byte, in signed tenths of a volt
    pub fn set_voltage(&self, raw: u8) {
        self.state().voltage = raw;
    }

    /// Overwrite part of the history buffer
    pub fn set_history(&self, address: usize, data: &[u8]) {
        let mut state = self.state();
        let end = (address + data.len()).min(state.history.len());
        if address < end {
            state.history[address..end].copy_from_slice(&data[..end - address]);
        }
    }

    /// Overwrite one byte of the device's NVM configuration
    pub fn set_nvm_byte(&self, offset: usize, value: u8) {
        if let Some(byte) = self.state().nvm.get_mut(offset) {
            *byte = value;
        }
    }

    /// The device's NVM configuration
    pub fn nvm(&self) -> [u8; NVM_SIZE] {
        self.state().nvm
    }

    /// Stop answering commands (they are still recorded)
    pub fn set_silent(&self, silent: bool) {
        self.state().silent = silent;
    }

    /// Cut every response to at most `len` bytes
    pub fn truncate_responses(&self, len: Option<usize>) {
        self.state().truncate = len;
    }

    /// Queue bytes the host has not asked for
    pub fn inject_stray(&self, bytes: &[u8]) {
        self.state().pending.extend(bytes.iter().copied());
    }

    /// Withhold the acknowledgement (and the write) for WCFG number `index`
    /// after the next erase, counting from zero
    pub fn fail_write_ack_at(&self, index: Option<usize>) {
        self.state().fail_write_at = index;
    }

    /// Every command written so far, in order
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state().commands.clone()
    }

    /// Reads that found nothing to return
    pub fn timeouts(&self) -> usize {
        self.state().timeouts
    }

    /// Whether heartbeat mode is on
    pub fn is_heartbeat_on(&self) -> bool {
        self.state().heartbeat
    }

    /// Whether the counter is still powered
    pub fn is_powered(&self) -> bool {
        self.state().powered
    }

    /// Key codes pressed so far
    pub fn keys(&self) -> Vec<u8> {
        self.state().keys.clone()
    }

    /// Clock as YY, MM, DD, HH, MM, SS
    pub fn clock(&self) -> [u8; 6] {
        self.state().clock
    }
}

impl State {
    fn cpm(&mut self) -> u16 {
        match self.cpm {
            Some(cpm) => cpm,
            None => self.rng.gen_range(10..40),
        }
    }

    fn cps(&mut self) -> u16 {
        match self.cps {
            Some(cps) => cps,
            None => self.rng.gen_range(0..4),
        }
    }

    fn respond(&mut self, response: &[u8]) {
        let len = self
            .truncate
            .map_or(response.len(), |max| max.min(response.len()));
        self.pending.extend(&response[..len]);
    }

    fn handle(&mut self, command: &[u8]) {
        self.commands.push(command.to_vec());

        if self.silent || !self.powered {
            return;
        }

        let body = match command
            .strip_prefix(&[COMMAND_START])
            .and_then(|c| c.strip_suffix(COMMAND_END))
        {
            Some(body) => body,
            None => {
                debug!("sim: ignoring unframed input {:02x?}", command);
                return;
            }
        };

        match body {
            b"GETVER" => {
                let mut version = self.version.clone();
                version.resize(14, b' ');
                self.respond(&version);
            }
            b"GETSERIAL" => {
                let serial = self.serial;
                self.respond(&serial);
            }
            b"GETCPM" => {
                let cpm = self.cpm();
                self.respond(&cpm.to_be_bytes());
            }
            b"GETCPS" => {
                let cps = self.cps();
                self.respond(&cps.to_be_bytes());
            }
            b"GETVOLT" => {
                let voltage = self.voltage;
                self.respond(&[voltage]);
            }
            b"GETCFG" => {
                let nvm = self.nvm;
                self.respond(&nvm);
            }
            b"ECFG" => {
                self.nvm = [0xFF; NVM_SIZE];
                self.writes_since_erase = 0;
                self.respond(&[ACK]);
            }
            b"CFGUPDATE" => self.respond(&[ACK]),
            b"HEARTBEAT1" => self.heartbeat = true,
            b"HEARTBEAT0" => {
                // one sample was already on the wire
                if self.heartbeat {
                    let cps = self.cps();
                    self.pending.extend(cps.to_be_bytes());
                }
                self.heartbeat = false;
            }
            b"POWEROFF" => {
                self.powered = false;
                self.heartbeat = false;
            }
            [b'W', b'C', b'F', b'G', offset, value] => {
                let index = self.writes_since_erase;
                self.writes_since_erase += 1;
                if self.fail_write_at == Some(index) {
                    trace!("sim: dropping WCFG #{}", index);
                    return;
                }
                self.nvm[*offset as usize] = *value;
                self.respond(&[ACK]);
            }
            [b'K', b'E', b'Y', key @ b'0'..=b'3'] => self.keys.push(*key),
            [b'S', b'P', b'I', b'R', a2, a1, a0, l_lo, l_hi] => {
                let address = u32::from_be_bytes([0, *a2, *a1, *a0]) as usize;
                let length = u16::from_le_bytes([*l_lo, *l_hi]) as usize;
                let start = address.min(self.history.len());
                let end = (address + length).min(self.history.len());
                let block = self.history[start..end].to_vec();
                self.respond(&block);
            }
            _ => {
                if let Some(slot) = clock_slot(body) {
                    if let Some(value) = body.last() {
                        self.clock[slot] = *value;
                        self.respond(&[ACK]);
                    }
                } else {
                    debug!("sim: unknown command {:02x?}", body);
                }
            }
        }
    }
}

/// Index into the clock array for a `SETDATE`/`SETTIME` body
fn clock_slot(body: &[u8]) -> Option<usize> {
    const NAMES: [&[u8]; 6] = [
        b"SETDATEYY",
        b"SETDATEMM",
        b"SETDATEDD",
        b"SETTIMEHH",
        b"SETTIMEMM",
        b"SETTIMESS",
    ];
    if body.len() != NAMES[0].len() + 1 {
        return None;
    }
    NAMES.iter().position(|name| body.starts_with(name))
}

impl Transport for SimulatedCounter {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "simulator closed"));
        }
        state.handle(bytes);
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut state = self.state();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "simulator closed"));
        }

        if state.pending.is_empty() && state.heartbeat && !state.silent {
            let cps = state.cps();
            state.pending.extend(cps.to_be_bytes());
        }

        match state.pending.pop_front() {
            Some(byte) => Ok(Some(byte)),
            None => {
                state.timeouts += 1;
                Ok(None)
            }
        }
    }

    fn set_byte_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.state().closed = true;
    }
}
