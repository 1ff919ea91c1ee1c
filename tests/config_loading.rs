// tests/config_loading.rs

use std::path::PathBuf;
use std::time::Duration;

use renderq::config::loader::apply_env_overrides;
use renderq::config::{ConfigFile, RawConfigFile, load_and_validate, parse_duration};
use renderq::errors::RenderqError;
use renderq::types::{GpuBackend, OutputFormat};
use tempfile::TempDir;

fn parse(toml_text: &str) -> Result<ConfigFile, RenderqError> {
    let raw: RawConfigFile = toml::from_str(toml_text)?;
    ConfigFile::try_from(raw)
}

#[test]
fn empty_file_yields_defaults() {
    let cfg = parse("").unwrap();

    assert_eq!(cfg.renderer.executable, PathBuf::from("blender"));
    assert_eq!(cfg.renderer.driver_script, PathBuf::from("render_script.py"));
    assert!(cfg.renderer.use_gpu);
    assert_eq!(cfg.renderer.gpu_backend, GpuBackend::Optix);
    assert_eq!(cfg.defaults.format, OutputFormat::Png);
    assert_eq!(cfg.defaults.samples, 128);
    assert_eq!((cfg.defaults.resolution_x, cfg.defaults.resolution_y), (1920, 1080));
    assert_eq!(cfg.render_slots, 1);
    assert_eq!(cfg.queue_horizon, Duration::from_secs(1800));
    assert_eq!(cfg.log_tail_lines, 200);
    assert_eq!(cfg.kill_grace, Duration::from_secs(10));
    assert_eq!(cfg.output_root, PathBuf::from("rendered"));
    assert_eq!(cfg, ConfigFile::default());
}

#[test]
fn all_sections_are_read() {
    let cfg = parse(
        r#"
[renderer]
executable = "/opt/blender/blender"
use_gpu = false
gpu_backend = "metal"

[defaults]
format = "open_exr"
samples = 32
resolution_x = 640
resolution_y = 360

[scheduler]
render_slots = 3
queue_horizon = "2h"

[supervisor]
log_tail_lines = 50
kill_grace = "500ms"

[paths]
output_root = "/var/renders"
"#,
    )
    .unwrap();

    assert_eq!(cfg.renderer.executable, PathBuf::from("/opt/blender/blender"));
    assert_eq!(cfg.renderer.gpu_backend, GpuBackend::Metal);
    assert_eq!(cfg.render_slots, 3);
    assert_eq!(cfg.queue_horizon, Duration::from_secs(7200));
    assert_eq!(cfg.kill_grace, Duration::from_millis(500));
    assert_eq!(cfg.output_root, PathBuf::from("/var/renders"));

    let defaults = cfg.render_defaults();
    assert_eq!(defaults.format, OutputFormat::OpenExr);
    assert_eq!(defaults.samples, 32);
    assert!(!defaults.use_gpu);
}

#[test]
fn invalid_limits_are_rejected() {
    for (text, needle) in [
        ("[scheduler]\nrender_slots = 0", "render_slots"),
        ("[supervisor]\nlog_tail_lines = 0", "log_tail_lines"),
        ("[defaults]\nsamples = 0", "samples"),
        ("[renderer]\nexecutable = \"\"", "executable"),
        ("[supervisor]\nkill_grace = \"soon\"", "kill_grace"),
        ("[scheduler]\nqueue_horizon = \"10\"", "queue_horizon"),
        (
            "[scheduler]\nqueue_horizon = \"9999999999999999h\"",
            "queue_horizon",
        ),
    ] {
        match parse(text) {
            Err(RenderqError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "{text:?} -> {msg}")
            }
            other => panic!("{text:?} should be rejected, got {other:?}"),
        }
    }
}

#[test]
fn unknown_format_is_a_toml_error() {
    assert!(matches!(
        parse("[defaults]\nformat = \"gif\""),
        Err(RenderqError::TomlError(_))
    ));
}

#[test]
fn relative_paths_resolve_against_config_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Renderq.toml");
    std::fs::write(
        &path,
        r#"
[renderer]
executable = "/usr/bin/blender"
driver_script = "scripts/render_script.py"

[paths]
output_root = "out"
"#,
    )
    .unwrap();

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(
        cfg.renderer.driver_script,
        dir.path().join("scripts/render_script.py")
    );
    assert_eq!(cfg.output_root, dir.path().join("out"));
}

#[test]
fn renderer_path_override_replaces_executable() {
    let mut raw = RawConfigFile::default();
    apply_env_overrides(&mut raw, Some(PathBuf::from("/custom/blender")));
    assert_eq!(raw.renderer.executable, PathBuf::from("/custom/blender"));

    let mut raw = RawConfigFile::default();
    apply_env_overrides(&mut raw, Some(PathBuf::new()));
    assert_eq!(raw.renderer.executable, PathBuf::from("blender"));

    apply_env_overrides(&mut raw, None);
    assert_eq!(raw.renderer.executable, PathBuf::from("blender"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("nope.toml")),
        Err(RenderqError::IoError(_))
    ));
}

#[test]
fn durations_accept_common_units() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
    assert_eq!(parse_duration(" 30m ").unwrap(), Duration::from_secs(1800));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("5").is_err());
    assert!(parse_duration("5d").is_err());
    assert!(parse_duration("s").is_err());
}

#[test]
fn oversized_durations_are_errors_not_overflows() {
    let err = parse_duration("9999999999999999h").unwrap_err();
    assert!(err.contains("too large"), "{err}");
    assert!(parse_duration("999999999999999999999s").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s").unwrap(),
        Duration::from_secs(u64::MAX)
    );
}
