use gqgmc_core::prelude::*;
use gqgmc_core::protocol::{clear_input_buffer, communicate};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock serial port with a scripted reply stream
#[derive(Clone, Default)]
struct MockSerial {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sent: Vec<u8>,
    replies: VecDeque<u8>,
    fail_on_send: bool,
    fail_on_read: bool,
}

impl MockSerial {
    fn with_response(response: &[u8]) -> Self {
        let mock = Self::default();
        mock.inner.lock().unwrap().replies.extend(response);
        mock
    }

    fn sent(&self) -> Vec<u8> {
        self.inner.lock().unwrap().sent.clone()
    }
}

impl Transport for MockSerial {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        state.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_on_read {
            return Err(io::Error::new(io::ErrorKind::Other, "Serial read failed"));
        }
        Ok(state.replies.pop_front())
    }

    fn set_byte_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

fn handle(mock: &MockSerial) -> DeviceHandle {
    DeviceHandle::from_transport("mock", Box::new(mock.clone()))
}

#[test]
fn test_exact_bytes_on_the_wire() {
    let mock = MockSerial::default();
    let mut dev = handle(&mock);

    communicate(&mut dev, b"<GETVOLT>>", 0);
    assert_eq!(mock.sent(), b"<GETVOLT>>".to_vec());
}

#[test]
fn test_history_request_wire_layout() {
    let mock = MockSerial::default();
    let mut dev = handle(&mock);

    capability::get_history_data(&mut dev, 0x00_0200, 0x0102);
    assert_eq!(
        mock.sent(),
        vec![b'<', b'S', b'P', b'I', b'R', 0x00, 0x02, 0x00, 0x02, 0x01, b'>', b'>']
    );
    assert_eq!(dev.error(), Some(&GmcError::HistoryReadFailed));
}

#[test]
fn test_write_failure_surfaces_as_short_read() {
    let mock = MockSerial::default();
    mock.inner.lock().unwrap().fail_on_send = true;
    let mut dev = handle(&mock);

    assert_eq!(capability::get_cpm(&mut dev), 0);
    assert_eq!(dev.error(), Some(&GmcError::CpmReadFailed));
    assert!(!dev.errors().read_ok());
}

#[test]
fn test_read_error_while_clearing_is_clear_failed() {
    let mock = MockSerial::default();
    mock.inner.lock().unwrap().fail_on_read = true;
    let mut dev = handle(&mock);

    assert!(!clear_input_buffer(&mut dev));
    assert_eq!(dev.error(), Some(&GmcError::ClearFailed));
}

#[test]
fn test_each_exchange_resets_error_state() {
    let mock = MockSerial::default();
    let mut dev = handle(&mock);

    capability::get_cps(&mut dev);
    assert_eq!(dev.error(), Some(&GmcError::CpsReadFailed));

    let response = communicate(&mut dev, b"", 0);
    assert_eq!(response, Some(Vec::new()));
    assert!(dev.error().is_none());
    assert!(dev.errors().read_ok());
}

#[test]
fn test_leftover_bytes_are_discarded() {
    // a late reply from an earlier exchange still sits in the input
    let mock = MockSerial::with_response(&[0x12, 0x34]);
    let mut dev = handle(&mock);

    assert_eq!(capability::get_cpm(&mut dev), 0);
    assert_eq!(dev.error(), Some(&GmcError::CpmReadFailed));
}

#[test]
fn test_transport_error_display() {
    let err = TransportError::PortNotFound("/dev/ttyUSB9".to_string());
    assert!(err.to_string().contains("/dev/ttyUSB9"));
}
