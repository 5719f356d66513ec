//! Server configuration module.
//!
//! Handles loading and validating `quire.toml`. All keys are optional except
//! the repository lists' `id` and location; everything else falls back to the
//! defaults shown below.
//!
//! ## Config File Location
//!
//! The first existing file wins:
//!
//! ```text
//! --config <path>            # explicit, must exist
//! ./quire.toml
//! ./config/quire.toml
//! /etc/quire/quire.toml
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! listen = "0.0.0.0:8080"     # HTTP bind address
//! mirrors_dir = "repos"       # Where remote repositories are cloned
//! background_refresh = true   # Re-sync and re-index every 15 minutes
//!
//! [cache]
//! backend = "memory"          # memory | sled | redis
//! ttl_secs = 0                # Entry lifetime, 0 = never expire; otherwise
//!                             # needs background_refresh and at least 900
//! sled_path = ".quire-cache"  # sled database directory
//! redis_url = "redis://127.0.0.1:6379/0"
//!
//! [[remote_repos]]
//! id = "docs"
//! url = "https://github.com/acme/docs.git"
//! root_path = "articles"      # Content root inside the repository
//! fallback_lang = ""          # Language for repositories without locale dirs
//!
//! [[local_repos]]
//! id = "handbook"
//! path = "/srv/handbook"
//! root_path = "articles"
//! fallback_lang = "en"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::index::RepoSource;
use crate::locale::is_valid_locale;
use crate::mirror::{Mirrors, sanitize_origin};
use crate::refresh::REFRESH_INTERVAL;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file name searched in the default locations.
pub const CONFIG_FILENAME: &str = "quire.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("No quire.toml found (searched: {0})")]
    NotFound(String),
}

/// Server configuration loaded from `quire.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub listen: String,
    /// Directory holding mirrors of remote repositories.
    pub mirrors_dir: String,
    /// Run the steady-state refresh loop after priming.
    pub background_refresh: bool,
    /// Cache backend selection.
    pub cache: CacheConfig,
    /// Repositories cloned from a git remote.
    pub remote_repos: Vec<RemoteRepo>,
    /// Repositories read straight from the filesystem.
    pub local_repos: Vec<LocalRepo>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            mirrors_dir: "repos".to_string(),
            background_refresh: true,
            cache: CacheConfig::default(),
            remote_repos: Vec::new(),
            local_repos: Vec::new(),
        }
    }
}

/// Which cache backend to build at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sled,
    Redis,
}

/// Cache backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Entry lifetime in seconds; 0 disables expiry.
    pub ttl_secs: u64,
    /// sled database directory.
    pub sled_path: String,
    /// Redis connection URL.
    pub redis_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl_secs: 0,
            sled_path: ".quire-cache".to_string(),
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

/// A repository mirrored from a git remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteRepo {
    pub id: String,
    pub url: String,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default)]
    pub fallback_lang: String,
}

/// A repository read from a local directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalRepo {
    pub id: String,
    pub path: String,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default)]
    pub fallback_lang: String,
}

fn default_root_path() -> String {
    "articles".to_string()
}

impl ServerConfig {
    /// Validate ids, languages and backend settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let entries = self
            .remote_repos
            .iter()
            .map(|r| (&r.id, &r.fallback_lang))
            .chain(self.local_repos.iter().map(|r| (&r.id, &r.fallback_lang)));

        for (id, fallback) in entries {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "repository id must not be empty".into(),
                ));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate repository id '{id}'"
                )));
            }
            if !fallback.is_empty() && !is_valid_locale(fallback) {
                return Err(ConfigError::Validation(format!(
                    "fallback_lang '{fallback}' of '{id}' must be two lowercase letters"
                )));
            }
        }

        if self.remote_repos.iter().any(|r| r.url.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "remote_repos.url must not be empty".into(),
            ));
        }
        if self.local_repos.iter().any(|r| r.path.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "local_repos.path must not be empty".into(),
            ));
        }

        let mut mirrors: HashMap<String, &str> = HashMap::new();
        for repo in &self.remote_repos {
            if let Some(other) = mirrors.insert(sanitize_origin(&repo.url), &repo.url)
                && other != repo.url
            {
                return Err(ConfigError::Validation(format!(
                    "remote urls '{other}' and '{}' map to the same mirror directory",
                    repo.url
                )));
            }
        }

        if self.cache.ttl_secs > 0 {
            if !self.background_refresh {
                return Err(ConfigError::Validation(
                    "cache.ttl_secs requires background_refresh, nothing would replace the expired snapshot".into(),
                ));
            }
            if self.cache.ttl_secs < REFRESH_INTERVAL.as_secs() {
                return Err(ConfigError::Validation(format!(
                    "cache.ttl_secs must be at least {} so the snapshot outlives a refresh cycle",
                    REFRESH_INTERVAL.as_secs()
                )));
            }
        }

        match self.cache.backend {
            CacheBackend::Sled if self.cache.sled_path.trim().is_empty() => {
                return Err(ConfigError::Validation(
                    "cache.sled_path is required for the sled backend".into(),
                ));
            }
            CacheBackend::Redis if self.cache.redis_url.trim().is_empty() => {
                return Err(ConfigError::Validation(
                    "cache.redis_url is required for the redis backend".into(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    /// Index sources for every configured repository, remote ones first.
    pub fn sources(&self, mirrors: &Mirrors) -> Vec<RepoSource> {
        let remote = self.remote_repos.iter().map(|r| RepoSource {
            id: r.id.clone(),
            origin: r.url.clone(),
            checkout: mirrors.mirror_path(&r.url),
            root: r.root_path.clone(),
            fallback_lang: r.fallback_lang.clone(),
        });
        let local = self.local_repos.iter().map(|r| RepoSource {
            id: r.id.clone(),
            origin: r.path.clone(),
            checkout: PathBuf::from(&r.path),
            root: r.root_path.clone(),
            fallback_lang: r.fallback_lang.clone(),
        });
        remote.chain(local).collect()
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit path.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Default search locations, in priority order.
pub fn default_locations() -> Vec<PathBuf> {
    vec![
        PathBuf::from(CONFIG_FILENAME),
        Path::new("config").join(CONFIG_FILENAME),
        Path::new("/etc/quire").join(CONFIG_FILENAME),
    ]
}

/// Load from `explicit` if given, otherwise from the first default location
/// that exists.
pub fn discover_config(explicit: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let candidates = default_locations();
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            load_config(path)
        }
        None => Err(ConfigError::NotFound(
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

/// Returns a fully-commented stock `quire.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# quire configuration
# ====================
# All top-level settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# HTTP bind address.
listen = "0.0.0.0:8080"

# Directory where remote repositories are cloned.
mirrors_dir = "repos"

# Re-sync remote repositories and re-index everything every 15 minutes.
background_refresh = true

# ---------------------------------------------------------------------------
# Cache backend
# ---------------------------------------------------------------------------
[cache]
# memory: in-process, lost on restart
# sled:   embedded on-disk database
# redis:  shared network cache (must be reachable at startup)
backend = "memory"

# Entry lifetime in seconds. 0 keeps entries until they are replaced.
# A non-zero value needs background_refresh and must be at least 900, or the
# published snapshot expires before anything replaces it.
ttl_secs = 0

# sled database directory (sled backend only).
sled_path = ".quire-cache"

# Redis connection URL (redis backend only).
redis_url = "redis://127.0.0.1:6379/0"

# ---------------------------------------------------------------------------
# Repositories
# ---------------------------------------------------------------------------
# Remote repositories are cloned into mirrors_dir and pulled on refresh.
#
# [[remote_repos]]
# id = "docs"
# url = "https://github.com/acme/docs.git"
# root_path = "articles"    # content root inside the repository
# fallback_lang = ""        # language when there are no locale directories ("en" if empty)

# Local repositories are read in place.
#
# [[local_repos]]
# id = "handbook"
# path = "/srv/handbook"
# root_path = "articles"
# fallback_lang = "en"
"##
}
