// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RenderqError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RenderqError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let queue_horizon = parse_duration(&raw.scheduler.queue_horizon)
            .map_err(|e| config_error(format!("[scheduler].queue_horizon: {e}")))?;
        let kill_grace = parse_duration(&raw.supervisor.kill_grace)
            .map_err(|e| config_error(format!("[supervisor].kill_grace: {e}")))?;
        Ok(ConfigFile::new_unchecked(raw, queue_horizon, kill_grace))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_renderer(cfg)?;
    validate_defaults(cfg)?;
    validate_limits(cfg)?;
    Ok(())
}

fn validate_renderer(cfg: &RawConfigFile) -> Result<()> {
    if cfg.renderer.executable.as_os_str().is_empty() {
        return Err(config_error("[renderer].executable must not be empty"));
    }
    if cfg.renderer.driver_script.as_os_str().is_empty() {
        return Err(config_error("[renderer].driver_script must not be empty"));
    }
    Ok(())
}

fn validate_defaults(cfg: &RawConfigFile) -> Result<()> {
    let d = &cfg.defaults;
    for (field, value) in [
        ("samples", d.samples),
        ("resolution_x", d.resolution_x),
        ("resolution_y", d.resolution_y),
    ] {
        if value == 0 {
            return Err(config_error(format!(
                "[defaults].{field} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

fn validate_limits(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.render_slots == 0 {
        return Err(config_error("[scheduler].render_slots must be >= 1 (got 0)"));
    }
    if cfg.supervisor.log_tail_lines == 0 {
        return Err(config_error(
            "[supervisor].log_tail_lines must be >= 1 (got 0)",
        ));
    }
    Ok(())
}

fn config_error(msg: impl Into<String>) -> RenderqError {
    RenderqError::ConfigError(msg.into())
}

/// Parse `<digits><unit>` with unit `ms`, `s`, `m` or `h`, e.g. `"250ms"`
/// or `"2h"`. Values that overflow a `Duration` are rejected.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let unit = s.trim_start_matches(|c: char| c.is_ascii_digit());
    let digits = &s[..s.len() - unit.len()];

    if digits.is_empty() {
        return Err(format!("'{s}' does not start with a number"));
    }
    let unit = unit.trim().to_ascii_lowercase();
    if unit.is_empty() {
        return Err(format!("'{s}' is missing a unit (ms, s, m or h)"));
    }

    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid number '{digits}': {e}"))?;

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        other => return Err(format!("unknown unit '{other}'; expected ms, s, m or h")),
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("'{s}' is too large"))
}
