use gqgmc_core::nvm::{NVM_SIZE, DATA_SAVE_ADDRESS_RESET};
use gqgmc_core::prelude::*;
use gqgmc_core::protocol::commands;
use pretty_assertions::assert_eq;

fn device() -> (SimulatedCounter, DeviceHandle) {
    let sim = SimulatedCounter::new();
    let dev = DeviceHandle::attach("sim", Box::new(sim.clone()));
    (sim, dev)
}

#[test]
fn test_open_fetches_device_configuration() {
    let (sim, dev) = device();
    assert_eq!(dev.image().as_bytes(), &sim.nvm());
    assert_eq!(nvm::save_data_type(&dev), Ok(SaveDataType::Cps));
    assert_eq!(nvm::data_save_address(&dev), DATA_SAVE_ADDRESS_RESET);
    assert!(!dev.image().has_changes());
}

#[test]
fn test_field_writes_read_back_in_every_width() {
    let (_sim, mut dev) = device();
    let values = [
        (ConfigField::SpeakerOnOff, 0x01),
        (ConfigField::CounterDelay, 0xBEEF),
        (ConfigField::DataReadAddress, 0x00_8421),
        (ConfigField::CalibrationSvUc2, 0x3DCC_CCCD),
    ];

    for (field, value) in values {
        nvm::write_field(&mut dev, field, value).unwrap();
        assert_eq!(dev.image().read_field(field), value, "{field}");
    }
    assert_eq!(
        dev.image().dirty_fields(),
        vec![
            ConfigField::SpeakerOnOff,
            ConfigField::CalibrationSvUc2,
            ConfigField::DataReadAddress,
            ConfigField::CounterDelay,
        ]
    );
}

#[test]
fn test_field_write_touches_only_its_bytes() {
    let (_sim, mut dev) = device();
    let before = *dev.image().as_bytes();

    nvm::write_field(&mut dev, ConfigField::AlarmValueSvUc, 0x0102_0304).unwrap();

    let after = dev.image().as_bytes();
    for offset in 0..NVM_SIZE {
        if (27..31).contains(&offset) {
            continue;
        }
        assert_eq!(after[offset], before[offset], "offset {offset}");
    }
    assert_eq!(&after[27..31], &[0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn test_setters_do_not_commit() {
    let (sim, mut dev) = device();
    let before = sim.commands().len();

    nvm::set_save_data_type(&mut dev, SaveDataType::Cph).unwrap();
    nvm::reset_data_save_address(&mut dev).unwrap();

    assert_eq!(sim.commands().len(), before);
    assert!(dev.image().has_changes());
}

#[test]
fn test_commit_writes_every_byte_then_updates() {
    let (sim, mut dev) = device();
    nvm::set_save_data_type(&mut dev, SaveDataType::Cpm).unwrap();
    let expected = *dev.image().as_bytes();
    let before = sim.commands().len();

    nvm::commit(&mut dev).unwrap();

    let sent = &sim.commands()[before..];
    assert_eq!(sent.len(), NVM_SIZE + 2);
    assert_eq!(sent[0], b"<ECFG>>".to_vec());
    for (offset, value) in expected.iter().enumerate() {
        assert_eq!(
            sent[offset + 1],
            commands::write_config_byte(offset as u8, *value)
        );
    }
    assert_eq!(sent[NVM_SIZE + 1], b"<CFGUPDATE>>".to_vec());

    assert_eq!(sim.nvm(), expected);
    assert!(!dev.image().has_changes());
    assert!(dev.error().is_none());
}

#[test]
fn test_commit_halts_at_missing_ack() {
    let (sim, mut dev) = device();
    nvm::write_field(&mut dev, ConfigField::Zoom, 7).unwrap();
    sim.fail_write_ack_at(Some(17));
    let before = sim.commands().len();

    assert_eq!(
        nvm::commit(&mut dev),
        Err(GmcError::WriteFailed { offset: 17 })
    );
    assert_eq!(dev.error(), Some(&GmcError::WriteFailed { offset: 17 }));

    let sent = &sim.commands()[before..];
    // ECFG plus WCFG 0..=17
    assert_eq!(sent.len(), 1 + 18);
    assert!(!sent.contains(&b"<CFGUPDATE>>".to_vec()));

    // partially written, nothing rolled back
    assert_eq!(sim.nvm()[16], dev.image().as_bytes()[16]);
    assert_eq!(sim.nvm()[17], 0xFF);
    assert!(dev.image().has_changes());
}

#[test]
fn test_commit_aborts_when_erase_fails() {
    let (sim, mut dev) = device();
    sim.set_silent(true);
    let before = sim.commands().len();

    assert_eq!(nvm::commit(&mut dev), Err(GmcError::EraseFailed));
    assert_eq!(sim.commands().len(), before + 1);
}

#[test]
fn test_update_failure() {
    let (sim, mut dev) = device();
    sim.set_silent(true);

    assert_eq!(nvm::update(&mut dev), Err(GmcError::UpdateFailed));
    assert_eq!(dev.error(), Some(&GmcError::UpdateFailed));
}

#[test]
fn test_fetch_discards_pending_writes() {
    let (_sim, mut dev) = device();
    nvm::set_save_data_type(&mut dev, SaveDataType::Off).unwrap();

    nvm::fetch(&mut dev).unwrap();
    assert_eq!(nvm::save_data_type(&dev), Ok(SaveDataType::Cps));
    assert!(!dev.image().has_changes());
}

#[test]
fn test_value_too_wide_is_rejected() {
    let (_sim, mut dev) = device();
    let err = nvm::write_field(&mut dev, ConfigField::AlarmCpmValue, 0x1_0000).unwrap_err();
    assert!(err.to_string().contains("AlarmCpmValue"));
    assert!(!dev.image().has_changes());
}

#[test]
fn test_commit_after_attach_keeps_untouched_settings() {
    let (sim, mut dev) = device();
    let before = sim.nvm();

    nvm::set_save_data_type(&mut dev, SaveDataType::Cpm).unwrap();
    nvm::commit(&mut dev).unwrap();

    let after = sim.nvm();
    assert_eq!(after[ConfigField::BacklightTimeoutSeconds.offset()], 30);
    assert_eq!(after[ConfigField::MaxBytes.offset()], 0xFF);
    assert_eq!(after[ConfigField::SaveDataType.offset()], 2);
    for offset in (0..NVM_SIZE).filter(|&o| o != ConfigField::SaveDataType.offset()) {
        assert_eq!(after[offset], before[offset], "offset {offset}");
    }
}
