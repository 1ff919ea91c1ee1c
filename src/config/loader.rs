// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable that overrides `[renderer].executable`.
pub const RENDERER_PATH_ENV: &str = "BLENDER_PATH";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Applies the `BLENDER_PATH` override.
/// - Resolves relative `driver_script` / `output_root` against the config
///   file's directory.
/// - Checks limits and parses durations.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let mut raw = load_from_path(path)?;
    apply_env_overrides(&mut raw, std::env::var_os(RENDERER_PATH_ENV).map(PathBuf::from));
    resolve_relative_paths(&mut raw, config_dir(path));
    ConfigFile::try_from(raw)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults (with
/// the environment override still applied).
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }
    let mut raw = RawConfigFile::default();
    apply_env_overrides(&mut raw, std::env::var_os(RENDERER_PATH_ENV).map(PathBuf::from));
    ConfigFile::try_from(raw)
}

/// Replace the renderer executable when an override is present and non-empty.
pub fn apply_env_overrides(raw: &mut RawConfigFile, renderer_path: Option<PathBuf>) {
    if let Some(p) = renderer_path {
        if !p.as_os_str().is_empty() {
            raw.renderer.executable = p;
        }
    }
}

fn resolve_relative_paths(raw: &mut RawConfigFile, base: Option<&Path>) {
    let Some(base) = base else {
        return;
    };
    if raw.renderer.driver_script.is_relative() {
        raw.renderer.driver_script = base.join(&raw.renderer.driver_script);
    }
    if raw.paths.output_root.is_relative() {
        raw.paths.output_root = base.join(&raw.paths.output_root);
    }
}

/// Directory containing the config file, or `None` for a bare filename.
fn config_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
