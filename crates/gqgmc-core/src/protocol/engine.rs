//! Command/response engine
//!
//! Every exchange is clear → send → read. Nothing on the wire marks where a
//! response begins or ends, so bytes left over from an earlier exchange would
//! be taken as the start of the next response unless the input is drained
//! first, and a response is complete only when the expected count has
//! arrived.

use tracing::{debug, warn};

use crate::device::DeviceHandle;
use crate::error::GmcError;

/// Transmit `command` verbatim
///
/// Write failures are logged and otherwise ignored: the read that follows
/// will come back short and report the failure.
pub fn send_command(dev: &mut DeviceHandle, command: &[u8]) {
    debug!("tx {:02x?}", command);
    if let Err(e) = dev.transport.write_all(command) {
        warn!("write to {} failed: {}", dev.path, e);
    }
}

/// Read exactly `expected` bytes, one byte at a time
///
/// Gives up after `expected` read attempts, so a silent device costs at most
/// `expected` byte timeouts. Returns `None` (and records `ReadIncomplete`) if
/// fewer than `expected` bytes arrived.
pub fn read_response(dev: &mut DeviceHandle, expected: usize) -> Option<Vec<u8>> {
    let mut response = Vec::with_capacity(expected);

    for _ in 0..expected {
        match dev.transport.read_byte() {
            Ok(Some(byte)) => response.push(byte),
            Ok(None) => {}
            Err(e) => warn!("read from {} failed: {}", dev.path, e),
        }
        if response.len() >= expected {
            break;
        }
    }

    if response.len() < expected {
        debug!(
            "rx incomplete: {} of {} bytes {:02x?}",
            response.len(),
            expected,
            response
        );
        dev.errors.mark_read(false);
        dev.errors.set(GmcError::ReadIncomplete {
            expected,
            received: response.len(),
        });
        return None;
    }

    debug!("rx {:02x?}", response);
    dev.errors.mark_read(true);
    Some(response)
}

/// Run one exchange: reset the error state, drain stale input, send
/// `command` (if any) and read `expected` bytes (if any)
pub fn communicate(dev: &mut DeviceHandle, command: &[u8], expected: usize) -> Option<Vec<u8>> {
    dev.errors.reset();

    if dev.streaming {
        warn!("heartbeat is on; the response will interleave with pushed samples");
    }

    clear_input_buffer(dev);

    if !command.is_empty() {
        send_command(dev, command);
    }

    if expected > 0 {
        read_response(dev, expected)
    } else {
        Some(Vec::new())
    }
}

/// Discard pending input until the line goes quiet
///
/// Reads at most `clear_max_tries` bytes. If every one of them produced data
/// the device is still talking; `ClearFailed` is recorded and `false`
/// returned. The handle stays usable.
pub fn clear_input_buffer(dev: &mut DeviceHandle) -> bool {
    let mut discarded = 0usize;

    for _ in 0..dev.clear_max_tries {
        match dev.transport.read_byte() {
            Ok(Some(_)) => discarded += 1,
            Ok(None) => {
                if discarded > 0 {
                    debug!("discarded {} stale input bytes", discarded);
                }
                return true;
            }
            Err(e) => {
                warn!("read from {} failed while clearing input: {}", dev.path, e);
                break;
            }
        }
    }

    warn!("input from {} did not go quiet after {} bytes", dev.path, discarded);
    dev.errors.set(GmcError::ClearFailed);
    false
}
