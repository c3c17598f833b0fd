//! Heartbeat mode
//!
//! With heartbeat on, the counter pushes a 2-byte CPS sample every second
//! without being asked. Samples are read straight off the line; any other
//! command sent meanwhile will have its response interleaved with them.

use tracing::{debug, info};

use crate::capability::decode_count;
use crate::device::DeviceHandle;
use crate::error::GmcError;
use crate::protocol::{clear_input_buffer, communicate, read_response, send_command, Command};

/// Start the once-a-second CPS push
pub fn turn_on(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    communicate(dev, &Command::HeartbeatOn.to_bytes(), 0);
    dev.streaming = true;
    info!("heartbeat on for {}", dev.path);
    dev.errors.as_result()
}

/// Stop the CPS push and drain whatever is still in flight
///
/// A sample already on its way when the command lands is discarded by the
/// final clear. If the line does not go quiet, `ClearFailed` is recorded but
/// the call still succeeds.
pub fn turn_off(dev: &mut DeviceHandle) -> Result<(), GmcError> {
    dev.errors.reset();
    send_command(dev, &Command::HeartbeatOff.to_bytes());
    dev.streaming = false;
    clear_input_buffer(dev);
    info!("heartbeat off for {}", dev.path);
    dev.errors.as_result()
}

/// Read the next pushed CPS sample
///
/// Blocks for up to two byte timeouts. Returns 0 and records
/// `AutoCpsReadFailed` if no complete sample arrives.
pub fn read_streamed(dev: &mut DeviceHandle) -> u16 {
    dev.errors.reset();
    match read_response(dev, 2) {
        Some(data) => {
            let cps = decode_count(data[0], data[1]);
            debug!("heartbeat sample {}", cps);
            cps
        }
        None => {
            dev.errors.set(GmcError::AutoCpsReadFailed);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::SimulatedCounter;

    #[test]
    fn test_turn_on_sets_flag() {
        let sim = SimulatedCounter::new();
        let mut dev = DeviceHandle::from_transport("sim", Box::new(sim.clone()));

        turn_on(&mut dev).unwrap();
        assert!(dev.is_streaming());
        assert_eq!(sim.commands(), vec![b"<HEARTBEAT1>>".to_vec()]);
    }

    #[test]
    fn test_read_without_heartbeat_fails() {
        let sim = SimulatedCounter::new();
        let mut dev = DeviceHandle::from_transport("sim", Box::new(sim));

        assert_eq!(read_streamed(&mut dev), 0);
        assert_eq!(dev.error(), Some(&GmcError::AutoCpsReadFailed));
    }
}
