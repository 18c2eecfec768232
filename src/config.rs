use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Community whose board is shown (omit for the server default)
  pub community: Option<String>,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub posts: PostsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
  /// Persist entries in a SQLite file in the data directory
  #[default]
  Sqlite,
  /// Keep entries for the lifetime of the process
  Memory,
  /// Never cache; every view waits for the network
  Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: CacheBackend,
  /// Seconds before a cached entry is considered stale
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
  /// Purge entries left by previous sessions on startup
  #[serde(default = "default_true")]
  pub purge_on_start: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      backend: CacheBackend::default(),
      ttl_secs: default_ttl_secs(),
      purge_on_start: true,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs.min(i64::MAX as u64) as i64)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostsConfig {
  /// Posts per page in the browser
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Posts shown on the landing view
  #[serde(default = "default_recent_size")]
  pub recent_size: u32,
}

impl Default for PostsConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      recent_size: default_recent_size(),
    }
  }
}

fn default_ttl_secs() -> u64 {
  300
}

fn default_true() -> bool {
  true
}

fn default_page_size() -> u32 {
  20
}

fn default_recent_size() -> u32 {
  4
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hearth.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hearth/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/hearth/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("hearth.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hearth").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Get the API token from environment variables.
  ///
  /// Checks HEARTH_API_TOKEN first, then COMMUNITY_API_TOKEN as fallback.
  /// Anonymous access is used when neither is set.
  pub fn get_api_token() -> Option<String> {
    std::env::var("HEARTH_API_TOKEN")
      .or_else(|_| std::env::var("COMMUNITY_API_TOKEN"))
      .ok()
      .filter(|t| !t.is_empty())
  }
}
