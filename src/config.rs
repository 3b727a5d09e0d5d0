use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::KeyDigest;

const DEFAULT_BASE_URL: &str = "https://rebrickable.com";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheSettings,
  #[serde(default)]
  pub database: DatabaseConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Scheme and host of the catalog service; endpoint paths are joined onto it
  #[serde(default = "default_base_url")]
  pub base_url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Sent as `Authorization: key <api_key>`. Normally read from the environment.
  #[serde(skip)]
  pub api_key: Option<String>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
      api_key: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

/// Settings for the in-memory response cache.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
  pub enabled: bool,
  /// TTL applied when a caller does not pass one
  pub default_ttl_ms: i64,
  /// Responses larger than this are not cached
  pub max_entry_bytes: usize,
  pub key_digest: KeyDigest,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      enabled: true,
      default_ttl_ms: 60 * 60 * 1000,
      max_entry_bytes: 10 * 1024 * 1024,
      key_digest: KeyDigest::Sha256,
    }
  }
}

impl CacheSettings {
  pub fn disabled() -> Self {
    Self {
      enabled: false,
      ..Self::default()
    }
  }

  /// Short-lived caching, five minutes per entry.
  pub fn memory_only() -> Self {
    Self {
      default_ttl_ms: 5 * 60 * 1000,
      ..Self::default()
    }
  }

  /// One day per entry.
  pub fn long_term() -> Self {
    Self {
      default_ttl_ms: 24 * 60 * 60 * 1000,
      ..Self::default()
    }
  }

  /// The configured TTL. Values outside the representable range become zero
  /// and are clamped by the cache.
  pub fn default_ttl(&self) -> Duration {
    Duration::try_milliseconds(self.default_ttl_ms).unwrap_or_else(Duration::zero)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
  /// Defaults to `$XDG_DATA_HOME/brixie/catalog.db`
  pub path: Option<PathBuf>,
}

impl DatabaseConfig {
  pub fn resolve_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.path {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("brixie").join("catalog.db"))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Default filter directive, overridden by `RUST_LOG`
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      file: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./brixie.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/brixie/config.yaml
  ///
  /// Built-in defaults are used when no file is found. The API key is always
  /// taken from the environment.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };
    config.api.api_key = Self::get_api_key().ok();

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("brixie.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("brixie").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Get the catalog API key from environment variables.
  ///
  /// Checks BRIXIE_API_KEY first, then REBRICKABLE_API_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("BRIXIE_API_KEY")
      .or_else(|_| std::env::var("REBRICKABLE_API_KEY"))
      .map_err(|_| {
        eyre!("API key not found. Set BRIXIE_API_KEY or REBRICKABLE_API_KEY environment variable.")
      })
  }
}
