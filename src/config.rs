use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::asana::DEFAULT_BASE_URL;
use crate::cache::CacheStore;
use crate::daemon::DEFAULT_SYNC_INTERVAL;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub asana: AsanaConfig,
  /// Project gids synced when none are given on the command line
  #[serde(default)]
  pub projects: Vec<String>,
  #[serde(default)]
  pub sync: SyncConfig,
  /// Override for the snapshot directory
  pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsanaConfig {
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for AsanaConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Seconds between sync passes
  #[serde(default = "default_interval_secs")]
  pub interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      interval_secs: default_interval_secs(),
    }
  }
}

fn default_interval_secs() -> u64 {
  DEFAULT_SYNC_INTERVAL.as_secs()
}

impl SyncConfig {
  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./asana-sync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/asana-sync/config.yaml
  ///
  /// With no file found, defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("asana-sync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("asana-sync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.sync.interval_secs == 0 {
      return Err(eyre!("sync.interval_secs must be greater than zero"));
    }
    if let Some(blank) = self.projects.iter().find(|p| p.trim().is_empty()) {
      return Err(eyre!("Invalid project id {:?}", blank));
    }
    Ok(())
  }

  /// Cache store at the configured directory, or the default one.
  pub fn cache_store(&self) -> Result<CacheStore> {
    match &self.cache_dir {
      Some(dir) => Ok(CacheStore::new(dir)),
      None => CacheStore::open_default(),
    }
  }

  /// Get the Asana API token.
  ///
  /// Uses the explicit value if given, then ASANA_SYNC_TOKEN, then ASANA_TOKEN.
  pub fn get_api_token(explicit: Option<&str>) -> Result<String> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
      return Ok(token.to_string());
    }
    std::env::var("ASANA_SYNC_TOKEN")
      .or_else(|_| std::env::var("ASANA_TOKEN"))
      .map_err(|_| {
        eyre!("Asana API token not found. Pass --token or set ASANA_SYNC_TOKEN or ASANA_TOKEN.")
      })
  }
}

/// Split a comma-separated project list, dropping blanks.
pub fn parse_project_list(raw: &str) -> Vec<String> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .map(String::from)
    .collect()
}
