use super::*;
use crate::error::GpioError;
use std::fs;

fn fake_sysfs_line(root: &std::path::Path, number: u32) {
    let dir = root.join(format!("gpio{}", number));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("value"), "0").unwrap();
    fs::write(dir.join("direction"), "in").unwrap();
    fs::write(dir.join("active_low"), "0").unwrap();
}

#[test]
fn test_sysfs_output_writes_direction_and_value() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs_line(root.path(), 23);

    let mut gpio = SysfsGpio::new(root.path(), 0);
    let mut trigger = gpio.claim_output(23, Level::Low).unwrap();
    assert_eq!(
        fs::read_to_string(root.path().join("gpio23/direction")).unwrap(),
        "low"
    );

    trigger.set_high().unwrap();
    assert_eq!(
        fs::read_to_string(root.path().join("gpio23/value")).unwrap(),
        "1"
    );
    trigger.set_low().unwrap();
    assert_eq!(
        fs::read_to_string(root.path().join("gpio23/value")).unwrap(),
        "0"
    );
}

#[test]
fn test_sysfs_input_reads_level_and_sets_active_low() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs_line(root.path(), 17);

    let mut gpio = SysfsGpio::new(root.path(), 0);
    let mut tap = gpio.claim_input(17, Bias::PullUp, true).unwrap();
    assert_eq!(
        fs::read_to_string(root.path().join("gpio17/active_low")).unwrap(),
        "1"
    );
    assert_eq!(tap.level().unwrap(), Level::Low);

    fs::write(root.path().join("gpio17/value"), "1").unwrap();
    assert_eq!(tap.level().unwrap(), Level::High);
}

#[test]
fn test_sysfs_chip_base_offset_and_cleanup() {
    let root = tempfile::tempdir().unwrap();
    fake_sysfs_line(root.path(), 571 + 24);

    let mut gpio = SysfsGpio::new(root.path(), 571);
    gpio.claim_input(24, Bias::None, false).unwrap();
    gpio.cleanup().unwrap();

    assert_eq!(
        fs::read_to_string(root.path().join("unexport")).unwrap(),
        "595"
    );
}

#[test]
fn test_sysfs_export_times_out_when_line_never_appears() {
    let root = tempfile::tempdir().unwrap();
    let mut gpio = SysfsGpio::new(root.path(), 0);

    match gpio.claim_output(5, Level::Low) {
        Err(GpioError::Export { pin, .. }) => assert_eq!(pin, 5),
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Export should fail without a gpio5 directory"),
    }
}

#[test]
fn test_mock_gpio_records_outputs_and_reads_inputs() {
    let mut gpio = MockGpio::new();
    let handle = gpio.clone();
    let level = gpio.input_level(17);

    let mut trigger = gpio.claim_output(23, Level::Low).unwrap();
    trigger.set_high().unwrap();
    trigger.set_low().unwrap();
    assert_eq!(
        handle.output_history(23),
        vec![Level::Low, Level::High, Level::Low]
    );

    let mut tap = gpio.claim_input(17, Bias::PullUp, true).unwrap();
    assert!(!tap.is_high().unwrap());
    level.set(Level::High);
    assert!(tap.is_high().unwrap());

    let mut unscripted = gpio.claim_input(24, Bias::None, false).unwrap();
    assert_eq!(unscripted.level().unwrap(), Level::Low);
}

#[test]
fn test_mock_gpio_cleanup_releases_lines() {
    let mut gpio = MockGpio::new();
    let handle = gpio.clone();
    let mut trigger = gpio.claim_output(23, Level::Low).unwrap();
    assert_eq!(handle.claimed_pins(), vec![23]);

    gpio.cleanup().unwrap();
    assert_eq!(handle.cleanup_count(), 1);
    assert!(handle.claimed_pins().is_empty());
    assert!(matches!(
        trigger.set_high(),
        Err(GpioError::Released { pin: 23 })
    ));
}

#[test]
fn test_mock_gpio_claim_failure() {
    let mut gpio = MockGpio::new();
    gpio.fail_claim(24);
    assert!(gpio.claim_input(24, Bias::None, false).is_err());
    // Failure is one-shot
    assert!(gpio.claim_input(24, Bias::None, false).is_ok());
}
