//! Configuration sections and their compiled defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the corpus lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Corpus description file.
    /// Default: datasets.json
    #[serde(default = "PathsConfig::default_corpus")]
    pub corpus: PathBuf,

    /// Root that recordings and ground-truth paths are relative to.
    /// Default: .
    #[serde(default = "PathsConfig::default_install_dir")]
    pub install_dir: PathBuf,
}

impl PathsConfig {
    fn default_corpus() -> PathBuf {
        PathBuf::from("datasets.json")
    }

    fn default_install_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus: Self::default_corpus(),
            install_dir: Self::default_install_dir(),
        }
    }
}

/// Analysis frames used for pedal matrices, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesConfig {
    /// Default: 0.046
    #[serde(default = "FramesConfig::default_frame_len")]
    pub frame_len: f64,

    /// Default: 0.01
    #[serde(default = "FramesConfig::default_hop")]
    pub hop: f64,
}

impl FramesConfig {
    fn default_frame_len() -> f64 {
        0.046
    }

    fn default_hop() -> f64 {
        0.01
    }
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            frame_len: Self::default_frame_len(),
            hop: Self::default_hop(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoresConfig {
    /// Alignment kinds requested when none are given on the command line.
    /// Default: ["misaligned"]
    #[serde(default = "ScoresConfig::default_kinds")]
    pub kinds: Vec<String>,
}

impl ScoresConfig {
    fn default_kinds() -> Vec<String> {
        vec!["misaligned".to_string()]
    }
}

impl Default for ScoresConfig {
    fn default() -> Self {
        Self {
            kinds: Self::default_kinds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
