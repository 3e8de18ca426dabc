use directories::ProjectDirs;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::session::SessionConfig;
use crate::solve::PuzzleType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReleaseInferenceConfig {
    pub initial_gap_ms: u64,
    pub repeat_gap_ms: u64,
}

impl Default for ReleaseInferenceConfig {
    fn default() -> Self {
        Self {
            initial_gap_ms: 550,
            repeat_gap_ms: 120,
        }
    }
}

/// Signed-in account; the token is used as-is as a bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub puzzle_type: PuzzleType,
    pub hold_duration_ms: u64,
    pub display_tick_ms: u64,
    pub average_windows: Vec<usize>,
    pub release_inference: ReleaseInferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            puzzle_type: PuzzleType::Cube3,
            hold_duration_ms: 300,
            display_tick_ms: 30,
            average_windows: vec![5, 12],
            release_inference: ReleaseInferenceConfig::default(),
            remote: None,
        }
    }
}

impl Config {
    /// Remote settings only count once both fields are filled in
    pub fn signed_in(&self) -> Option<&RemoteConfig> {
        self.remote
            .as_ref()
            .filter(|r| !r.base_url.trim().is_empty() && !r.token.trim().is_empty())
    }

    /// Average windows below 3 can never produce a value; they are dropped
    pub fn windows(&self) -> Vec<usize> {
        self.average_windows
            .iter()
            .copied()
            .filter(|&n| n >= 3)
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            puzzle_type: cfg.puzzle_type,
            hold_duration_ms: cfg.hold_duration_ms,
            average_windows: cfg.windows(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "prism") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("prism_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing file means defaults; a broken one is logged and replaced by defaults
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
