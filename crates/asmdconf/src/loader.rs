//! Config file discovery, loading, and environment variable overlay.

use crate::{AsmdConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/asmd/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("asmd/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("asmd.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load a TOML file over `config`. Keys absent from the file keep their
/// current values.
pub fn load_from_file(config: &mut AsmdConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay the sections present in a TOML document.
pub fn apply_toml(config: &mut AsmdConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let invalid = |key: &str, expected: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{} must be {}", key, expected),
    };

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("corpus") {
            config.paths.corpus = expand_path(v.as_str().ok_or_else(|| invalid("paths.corpus", "a string"))?);
        }
        if let Some(v) = paths.get("install_dir") {
            config.paths.install_dir =
                expand_path(v.as_str().ok_or_else(|| invalid("paths.install_dir", "a string"))?);
        }
    }

    if let Some(frames) = table.get("frames").and_then(|v| v.as_table()) {
        if let Some(v) = frames.get("frame_len") {
            config.frames.frame_len = as_seconds(v).ok_or_else(|| invalid("frames.frame_len", "a number"))?;
        }
        if let Some(v) = frames.get("hop") {
            config.frames.hop = as_seconds(v).ok_or_else(|| invalid("frames.hop", "a number"))?;
        }
    }

    if let Some(scores) = table.get("scores").and_then(|v| v.as_table()) {
        if let Some(v) = scores.get("kinds") {
            config.scores.kinds = v
                .as_array()
                .and_then(|kinds| {
                    kinds
                        .iter()
                        .map(|k| k.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| invalid("scores.kinds", "a list of strings"))?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level") {
            config.telemetry.log_level = v
                .as_str()
                .ok_or_else(|| invalid("telemetry.log_level", "a string"))?
                .to_string();
        }
    }

    Ok(())
}

// integers are accepted so `hop = 1` works
fn as_seconds(value: &toml::Value) -> Option<f64> {
    value.as_float().or_else(|| value.as_integer().map(|i| i as f64))
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut AsmdConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides read through `lookup`. Unparseable numbers are ignored.
pub fn apply_overrides_from(
    config: &mut AsmdConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("ASMD_CORPUS") {
        config.paths.corpus = expand_path(&v);
        sources.env_overrides.push("ASMD_CORPUS".to_string());
    }
    if let Some(v) = lookup("ASMD_INSTALL_DIR") {
        config.paths.install_dir = expand_path(&v);
        sources.env_overrides.push("ASMD_INSTALL_DIR".to_string());
    }

    if let Some(v) = lookup("ASMD_FRAME_LEN") {
        if let Ok(frame_len) = v.parse() {
            config.frames.frame_len = frame_len;
            sources.env_overrides.push("ASMD_FRAME_LEN".to_string());
        }
    }
    if let Some(v) = lookup("ASMD_HOP") {
        if let Ok(hop) = v.parse() {
            config.frames.hop = hop;
            sources.env_overrides.push("ASMD_HOP".to_string());
        }
    }

    if let Some(v) = lookup("ASMD_SCORE_KINDS") {
        config.scores.kinds = v
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        sources.env_overrides.push("ASMD_SCORE_KINDS".to_string());
    }

    if let Some(v) = lookup("ASMD_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("ASMD_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some((var_name, rest)) = stripped.split_once('/') {
            env::var(var_name)
                .map(|value| PathBuf::from(value).join(rest))
                .unwrap_or_else(|_| PathBuf::from(path))
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
