//! Engine tuning loaded from a TOML file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SurveyError, SurveyResult};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay before a linked notification advances on its own. `0` disables it.
    pub auto_advance_ms: u64,
    /// Longest chain of answer-less questions passed through in one step.
    pub max_pass_through: usize,
    /// Characters shown in question previews.
    pub preview_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_advance_ms: 3000,
            max_pass_through: 64,
            preview_chars: 30,
        }
    }
}

impl EngineConfig {
    /// Loads a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> SurveyResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> SurveyResult<Self> {
        toml::from_str(raw).map_err(|err| SurveyError::Config(err.to_string()))
    }

    pub fn save_to(&self, path: &Path) -> SurveyResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload =
            toml::to_string_pretty(self).map_err(|err| SurveyError::Config(err.to_string()))?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn auto_advance_delay(&self) -> Option<Duration> {
        (self.auto_advance_ms > 0).then(|| Duration::from_millis(self.auto_advance_ms))
    }
}
