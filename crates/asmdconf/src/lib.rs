//! Configuration loading for the asmd corpus tools.
//!
//! # Usage
//!
//! ```rust,no_run
//! use asmdconf::AsmdConfig;
//!
//! let config = AsmdConfig::load().expect("Failed to load config");
//! println!("corpus: {}", config.paths.corpus.display());
//! println!("hop: {}s", config.frames.hop);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/asmd/config.toml` (system)
//! 2. `~/.config/asmd/config.toml` (user)
//! 3. `./asmd.toml` (local override, or the path given on the command line)
//! 4. Environment variables (`ASMD_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! corpus = "~/asmd/datasets.json"
//! install_dir = "~/asmd"
//!
//! [frames]
//! frame_len = 0.046
//! hop = 0.01
//!
//! [scores]
//! kinds = ["precise_alignment", "broad_alignment"]
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{FramesConfig, PathsConfig, ScoresConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete asmd configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AsmdConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub frames: FramesConfig,
    #[serde(default)]
    pub scores: ScoresConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AsmdConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` replacing `./asmd.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(config_path: Option<&Path>) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = AsmdConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_from_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# asmd configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!("corpus = \"{}\"\n", self.paths.corpus.display()));
        output.push_str(&format!(
            "install_dir = \"{}\"\n",
            self.paths.install_dir.display()
        ));

        output.push_str("\n[frames]\n");
        output.push_str(&format!("frame_len = {:?}\n", self.frames.frame_len));
        output.push_str(&format!("hop = {:?}\n", self.frames.hop));

        output.push_str("\n[scores]\n");
        let kinds: Vec<String> = self.scores.kinds.iter().map(|k| format!("\"{}\"", k)).collect();
        output.push_str(&format!("kinds = [{}]\n", kinds.join(", ")));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AsmdConfig::default();
        assert_eq!(config.frames.frame_len, 0.046);
        assert_eq!(config.frames.hop, 0.01);
        assert_eq!(config.scores.kinds, vec!["misaligned"]);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = AsmdConfig::default();
        config.frames.hop = 0.5;
        config.scores.kinds = vec!["score".into(), "misaligned".into()];

        let rendered = config.to_toml();
        assert!(rendered.contains("[paths]"));
        assert!(rendered.contains("hop = 0.5"));

        let mut reloaded = AsmdConfig::default();
        loader::apply_toml(&mut reloaded, &rendered, Path::new("rendered.toml")).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_cli_path_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[paths]\ninstall_dir = \"/srv/asmd\"\n").unwrap();

        let (config, sources) = AsmdConfig::load_with_sources_from(Some(&path)).unwrap();
        assert_eq!(sources.files.last(), Some(&path));
        if !sources.env_overrides.iter().any(|v| v == "ASMD_INSTALL_DIR") {
            assert_eq!(config.paths.install_dir, PathBuf::from("/srv/asmd"));
        }
    }

    #[test]
    fn test_unreadable_file_is_reported() {
        let mut config = AsmdConfig::default();
        let err = loader::load_from_file(&mut config, Path::new("/nonexistent/asmd.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
