mod common;
use crate::common::init_tracing;

use std::io::Write;
use std::time::Duration;

use specflow::config::loader::{load_and_validate, load_from_path};
use specflow::config::{ExperimentConfig, RawExperimentFile};
use specflow::errors::SpecflowError;
use specflow_test_utils::builders::ExperimentBuilder;

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[test]
fn loads_a_full_experiment_file() {
    init_tracing();

    let file = write_toml(
        r#"
[exposure]
file_name_base = "sample"
grating = [300, 600]
exposure_s = [1.0, 2.0]
accumulations = [5]
frames = [1]

[calibration]
auto = [true, false]
lamp_switch = true
lamp_relay = 2
lamp_settle_ms = 1500

[batch]
enabled = true
num_spectra = 3
delay_s = 0.5

[sweep]
enabled = true
start = 20.0
step = 5.0
end = 40.0
loop = true
after_sweep = 25.0

[range]
enabled = true

[stage]
measurement_pos = 0
calibration_pos = 10000
"#,
    );

    let cfg = load_and_validate(file.path()).expect("valid config");

    assert_eq!(cfg.positions.len(), 2);
    assert_eq!(cfg.positions[0].grating, 300);
    assert_eq!(cfg.positions[1].exposure.exposure_s, 2.0);
    assert_eq!(cfg.positions[0].exposure.accumulations, 5);
    assert!(cfg.positions[0].auto_cal);
    assert!(!cfg.positions[1].auto_cal);

    let lamp = cfg.calibration.lamp.expect("lamp configured");
    assert_eq!(lamp.relay, 2);
    assert_eq!(lamp.settle, Duration::from_millis(1500));

    assert_eq!(cfg.batch.num_spectra, 3);

    let sweep = cfg.sweep.as_ref().expect("sweep configured");
    assert!(sweep.loop_back);
    assert_eq!(sweep.after_sweep, Some(25.0));

    assert!(cfg.is_ranged());
    assert_eq!(cfg.stage.calibration_pos, 10000);
}

#[test]
fn minimal_file_gets_defaults() {
    let file = write_toml(
        r#"
[exposure]
grating = [500]
"#,
    );

    let cfg = load_and_validate(file.path()).expect("valid config");
    assert_eq!(cfg.positions.len(), 1);
    assert_eq!(cfg.naming.base, "spectrum");
    assert_eq!(cfg.naming.first_number, 1);
    assert!(cfg.sweep.is_none());
    assert!(!cfg.is_batched());
    assert_eq!(cfg.stage.motor_poll_delay, Duration::from_millis(200));
    assert_eq!(cfg.stage.grating_settle, Duration::from_millis(5000));
}

#[test]
fn empty_grating_list_is_rejected() {
    let file = write_toml("[exposure]\ngrating = []\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, SpecflowError::ConfigError(_)), "got: {err}");
}

#[test]
fn zero_sweep_step_with_distinct_endpoints_is_rejected() {
    let raw: RawExperimentFile = toml::from_str(
        r#"
[exposure]
grating = [500]

[sweep]
enabled = true
start = 10.0
step = 0.0
end = 20.0
"#,
    )
    .expect("parses");

    let err = ExperimentConfig::try_from(raw).unwrap_err();
    assert!(matches!(err, SpecflowError::ConfigError(_)), "got: {err}");
}

#[test]
fn zero_batch_count_is_rejected() {
    let raw: RawExperimentFile = toml::from_str(
        r#"
[exposure]
grating = [500]

[batch]
enabled = true
num_spectra = 0
"#,
    )
    .expect("parses");

    let err = ExperimentConfig::try_from(raw).unwrap_err();
    assert!(matches!(err, SpecflowError::ConfigError(_)), "got: {err}");
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_path("definitely/not/here/Specflow.toml").unwrap_err();
    assert!(matches!(err, SpecflowError::IoError(_)), "got: {err}");
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = write_toml("[exposure\ngrating = [500]\n");
    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, SpecflowError::TomlError(_)), "got: {err}");
}

#[test]
fn disabled_batch_section_normalises_to_one_spectrum() {
    let cfg = ExperimentBuilder::new().grating(&[300]).build_raw();
    let mut raw = cfg;
    raw.batch.enabled = false;
    raw.batch.num_spectra = 9;

    let cfg = ExperimentConfig::try_from(raw).expect("valid");
    assert_eq!(cfg.batch.num_spectra, 1);
    assert!(!cfg.is_batched());
}
