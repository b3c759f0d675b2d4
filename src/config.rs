use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, UntestedError};
use crate::runner::{DEFAULT_TIMESLICE, RunOptions};

pub const FILE_NAME: &str = "untested.toml";

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Scheduler settings.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Host heartbeat period.
    pub tick_interval_ms: u64,
    /// Wall-clock budget for resuming tests within one tick.
    pub timeslice_ms: u64,
    pub no_timeouts: bool,
    pub include_disabled: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            timeslice_ms: DEFAULT_TIMESLICE.as_millis() as u64,
            no_timeouts: false,
            include_disabled: false,
        }
    }
}

impl RunConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions::new()
            .include_timeouts(!self.no_timeouts)
            .include_disabled(self.include_disabled)
            .timeslice(Duration::from_millis(self.timeslice_ms))
    }
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Where to write the JUnit report. No report when unset.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load `untested.toml` from `dir`, falling back to defaults if absent or invalid.
    pub fn load(dir: &Path) -> Self {
        Self::load_from(&dir.join(FILE_NAME)).unwrap_or_default()
    }

    /// Load an explicit config file. Unlike [`Config::load`], errors are reported.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| UntestedError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
