use stationd::config::*;
use stationd::error::{AllocError, ConfigError};
use stationd::gpio::GpioLine;
use stationd::PinAllocator;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_defaults_match_wiring_harness() {
    let config = StationConfig::default();

    assert_eq!(config.network.bind, DEFAULT_BIND);
    assert_eq!(config.interlock.max_active_tx, 1);
    assert_eq!(config.interlock.guard_window(), Duration::from_secs(20));
    assert_eq!(config.interlock.ptt_cooldown(), Duration::from_secs(120));
    assert_eq!(config.interlock.settle(), Duration::from_millis(100));
    assert_eq!(config.gpio.backend, GpioBackend::Sysfs);
    for label in REQUIRED_PINS {
        assert!(config.pins.contains_key(label), "missing default for {label}");
    }
    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_file_is_all_defaults() {
    let config = StationConfig::from_toml_str("").expect("parses");
    assert_eq!(config.pins.len(), REQUIRED_PINS.len());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_override() {
    let config = StationConfig::from_toml_str(
        r#"
        [network]
        bind = "127.0.0.1:6000"

        [interlock]
        max_active_tx = 2
        ptt_cooldown_secs = 60

        [gpio]
        backend = "simulated"
        "#,
    )
    .expect("parses");

    assert_eq!(config.bind_addr().expect("addr").port(), 6000);
    assert_eq!(config.interlock.max_active_tx, 2);
    assert_eq!(config.interlock.ptt_cooldown(), Duration::from_secs(60));
    // Untouched keys keep their defaults
    assert_eq!(config.interlock.guard_window_secs, GUARD_WINDOW_SECS);
    assert_eq!(config.gpio.backend, GpioBackend::Simulated);
}

#[test]
fn test_simulate_drops_sensor_from_loaded_config() {
    let mut config = StationConfig::from_toml_str(
        r#"
        [sensor]
        temperature_path = "/sys/class/hwmon/hwmon1/temp1_input"
        "#,
    )
    .expect("parses");
    assert_eq!(config.gpio.backend, GpioBackend::Sysfs);
    assert!(config.sensor.temperature_path.is_some());

    config.simulate();
    assert_eq!(config.gpio.backend, GpioBackend::Simulated);
    assert_eq!(config.sensor.temperature_path, None);
    assert!(config.validate().is_ok());

    assert_eq!(StationConfig::simulated().sensor.temperature_path, None);
}

#[test]
fn test_pin_table_replaces_defaults() {
    let err = StationConfig::from_toml_str(
        r#"
        [pins]
        vhf_rf_ptt = 4
        "#,
    )
    .expect_err("incomplete pin table");
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("is not set")));
}

#[test]
fn test_rejects_invalid_values() {
    for toml in [
        "[network]\nbind = \"not an address\"",
        "[interlock]\nmax_active_tx = 0",
        "[interlock]\nguard_window_secs = 0",
        "[interlock]\nptt_cooldown_secs = 0",
        "[logging]\nlevel = \"loud\"",
    ] {
        assert!(
            matches!(StationConfig::from_toml_str(toml), Err(ConfigError::Invalid(_))),
            "{toml}"
        );
    }

    assert!(matches!(
        StationConfig::from_toml_str("[gpio]\nbackend = \"gpiod\""),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_rejects_shared_pin_numbers() {
    let mut config = StationConfig::default();
    config.pins.insert("rotator_power".to_string(), 17);

    let err = config.validate().expect_err("duplicate pin");
    assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("pin 17")));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[logging]\nlevel = \"debug\"").expect("write");

    let config = StationConfig::load(file.path()).expect("loads");
    assert_eq!(config.logging.level, "debug");

    let missing = file.path().with_extension("absent");
    assert!(matches!(
        StationConfig::load(&missing),
        Err(ConfigError::Io { .. })
    ));
}

#[test]
fn test_shipped_sample_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/stationd.toml");
    let config = StationConfig::load(&path).expect("sample config loads");
    assert_eq!(config.pins, StationConfig::default().pins);
}

#[test]
fn test_allocator_enforces_single_owner() {
    let config = StationConfig::simulated();
    let mut allocator = PinAllocator::new(&config);

    allocator.acquire("vhf", "vhf_lna").expect("first claim");
    // The same owner may reopen its own pin
    allocator.acquire("vhf", "vhf_lna").expect("reclaim");
    assert_eq!(allocator.owner_of(22), Some("vhf"));

    let err = allocator.acquire("uhf", "vhf_lna").expect_err("stolen pin");
    assert!(matches!(err, AllocError::Conflict { pin: 22, ref owner, .. } if owner == "vhf"));

    let err = allocator.acquire("vhf", "vhf_dow_key").expect_err("unknown label");
    assert!(matches!(err, AllocError::UnknownLabel { .. }));
}

#[test]
fn test_simulated_lines_share_pin_state() {
    let config = StationConfig::simulated();
    let mut allocator = PinAllocator::new(&config);

    let mut line = allocator.acquire("rotator", "rotator_power").expect("claim");
    line.write(true).expect("write");

    let pin = allocator.simulated_pin("rotator_power").expect("simulated");
    assert!(pin.level());
    assert_eq!(pin.write_count(), 1);
    assert_eq!(line.label(), "rotator_power");
}
