use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alprbench_core::assets::{DEFAULT_ENDPOINT, default_cache_dir};
use alprbench_core::{BenchmarkConfig, SyntheticSettings};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub harness: HarnessSettings,
    #[serde(default)]
    pub assets: AssetSettings,
    #[serde(default)]
    pub synthetic: SyntheticSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    pub poll_interval_ms: u64,
    pub queue_capacity: usize,
    pub cpu_sample_every: u64,
    pub stream_ceiling: usize,
    /// 0 means one worker per logical CPU
    pub workers: usize,
    pub metadata_timeout_ms: u64,
    pub download_timeout_secs: u64,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            queue_capacity: 10,
            cpu_sample_every: 10,
            stream_ceiling: 256,
            workers: 0,
            metadata_timeout_ms: 1000,
            download_timeout_secs: 600,
        }
    }
}

impl HarnessSettings {
    /// Copy the tunables into a run configuration.
    pub fn apply(&self, config: &mut BenchmarkConfig) {
        config.poll_interval = Duration::from_millis(self.poll_interval_ms);
        config.queue_capacity = self.queue_capacity;
        config.cpu_sample_every = self.cpu_sample_every;
        config.stream_ceiling = self.stream_ceiling;
        if self.workers > 0 {
            config.workers = self.workers;
        }
    }

    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub endpoint: String,
    /// Empty selects the default cache under the temporary directory
    pub cache_dir: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_dir: String::new(),
        }
    }
}

impl AssetSettings {
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        if self.cache_dir.trim().is_empty() {
            default_cache_dir()
        } else {
            PathBuf::from(self.cache_dir.trim())
        }
    }
}

/// Settings layered from the built-in defaults and an optional user file.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Load from `explicit` if given, otherwise from the per-user location.
    ///
    /// An explicitly named file must exist; the per-user file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(anyhow!(
                "settings file {} does not exist",
                path.display()
            )),
            Some(path) => Self::load_with_path(path),
            None => Self::load_with_path(default_settings_path()?),
        }
    }

    pub fn load_with_path<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let mut merged: toml::Table =
            toml::from_str(DEFAULT_CONFIG).context("built-in settings are invalid")?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings at {}", path.display()))?;
            let user: toml::Table = toml::from_str(&contents)
                .with_context(|| format!("invalid settings at {}", path.display()))?;
            merge_tables(&mut merged, user);
        }

        let settings = toml::Value::Table(merged)
            .try_into()
            .with_context(|| format!("invalid settings at {}", path.display()))?;
        Ok(Self { path, settings })
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Overlay `user` onto `base`, descending into sections so a user file can
/// change one key without restating the rest of its section.
fn merge_tables(base: &mut toml::Table, user: toml::Table) {
    for (key, value) in user {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(section)) => {
                merge_tables(existing, section);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn default_settings_path() -> Result<PathBuf> {
    let base =
        dirs::config_dir().ok_or_else(|| anyhow!("unable to determine configuration directory"))?;
    Ok(base.join("alprbench").join("settings.toml"))
}
