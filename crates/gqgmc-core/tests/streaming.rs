use gqgmc_core::prelude::*;
use pretty_assertions::assert_eq;

fn device() -> (SimulatedCounter, DeviceHandle) {
    let sim = SimulatedCounter::new();
    let dev = DeviceHandle::attach("sim", Box::new(sim.clone()));
    (sim, dev)
}

#[test]
fn test_streamed_samples() {
    let (sim, mut dev) = device();
    sim.set_cps(0xC005);

    streaming::turn_on(&mut dev).unwrap();
    assert!(sim.is_heartbeat_on());

    for _ in 0..3 {
        assert_eq!(streaming::read_streamed(&mut dev), 5);
        assert!(dev.error().is_none());
    }
}

#[test]
fn test_streamed_read_sends_nothing() {
    let (sim, mut dev) = device();
    streaming::turn_on(&mut dev).unwrap();
    let before = sim.commands().len();

    streaming::read_streamed(&mut dev);
    streaming::read_streamed(&mut dev);
    assert_eq!(sim.commands().len(), before);
}

#[test]
fn test_turn_off_drains_in_flight_sample() {
    let (sim, mut dev) = device();
    sim.set_cpm(21);

    streaming::turn_on(&mut dev).unwrap();
    streaming::read_streamed(&mut dev);
    streaming::turn_off(&mut dev).unwrap();

    assert!(!dev.is_streaming());
    assert!(!sim.is_heartbeat_on());
    assert!(dev.error().is_none());

    // the next exchange sees only its own response
    assert_eq!(capability::get_cpm(&mut dev), 21);
    assert!(dev.error().is_none());
}

#[test]
fn test_streamed_read_failure() {
    let (sim, mut dev) = device();
    streaming::turn_on(&mut dev).unwrap();
    sim.set_silent(true);

    assert_eq!(streaming::read_streamed(&mut dev), 0);
    assert_eq!(dev.error(), Some(&GmcError::AutoCpsReadFailed));
}

#[test]
fn test_command_while_streaming_is_not_refused() {
    let (sim, mut dev) = device();
    streaming::turn_on(&mut dev).unwrap();
    let before = sim.commands().len();

    // samples keep arriving, so the line never goes quiet
    capability::get_battery_voltage(&mut dev);
    assert_eq!(sim.commands().len(), before + 1);
    assert!(dev.is_streaming());
}

#[test]
fn test_turn_off_tolerates_noisy_line() {
    let (sim, mut dev) = device();
    streaming::turn_on(&mut dev).unwrap();
    sim.inject_stray(&[0x5A; 40]);

    assert_eq!(streaming::turn_off(&mut dev), Ok(()));
    assert_eq!(dev.error(), Some(&GmcError::ClearFailed));
    assert!(!dev.is_streaming());
    assert!(!sim.is_heartbeat_on());
}
