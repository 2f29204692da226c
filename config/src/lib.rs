//! Configuration for tierfetch.
//!
//! Read from `~/.tierfetch/config.toml`. Every field is optional; accessors
//! fill in defaults so callers never handle `Option`.
//!
//! ```toml
//! [source]
//! base_url = "http://127.0.0.1:3000"
//! items_path = "/api/talk2/items"
//! bound_ms = 200
//!
//! [source.headers]
//! authorization = "Bearer ${ITEMS_TOKEN}"
//!
//! [client]
//! origin = "http://127.0.0.1:3000"
//!
//! [submit]
//! path = "/api/talk3"
//! ```
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const BASE_URL_ENV: &str = "TIERFETCH_BASE_URL";
pub const BOUND_MS_ENV: &str = "TIERFETCH_BOUND_MS";

#[derive(Debug, Default, Deserialize)]
pub struct TierfetchConfig {
    pub source: Option<SourceConfig>,
    pub client: Option<ClientConfig>,
    pub submit: Option<SubmitConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Where items come from and how long the server render waits for them.
#[derive(Debug, Default, Deserialize)]
pub struct SourceConfig {
    pub base_url: Option<String>,
    pub items_path: Option<String>,
    /// Signed so a bad value survives loading and is rejected by the deadline
    /// timer, not silently clamped here.
    pub bound_ms: Option<i64>,
    /// Extra request headers. Values may reference `${ENV_VARS}`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientConfig {
    /// Origin the client-side retry resolves relative URLs against.
    pub origin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitConfig {
    pub path: Option<String>,
}

impl TierfetchConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:3000";
    pub const DEFAULT_ITEMS_PATH: &'static str = "/api/talk2/items";
    pub const DEFAULT_BOUND_MS: i64 = 200;
    pub const DEFAULT_SUBMIT_PATH: &'static str = "/api/talk3";

    /// Load from the default path. `Ok(None)` when there is no config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// `TIERFETCH_BASE_URL`, then `[source] base_url`, then the default.
    #[must_use]
    pub fn base_url(&self) -> String {
        env::var(BASE_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.source.as_ref().and_then(|s| s.base_url.clone()))
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
    }

    #[must_use]
    pub fn items_path(&self) -> String {
        self.source
            .as_ref()
            .and_then(|s| s.items_path.clone())
            .unwrap_or_else(|| Self::DEFAULT_ITEMS_PATH.to_string())
    }

    /// Full server-side URL for the item list.
    #[must_use]
    pub fn items_url(&self) -> String {
        join_url(&self.base_url(), &self.items_path())
    }

    /// `TIERFETCH_BOUND_MS`, then `[source] bound_ms`, then the default.
    /// An unparseable env value is ignored with a warning.
    #[must_use]
    pub fn bound_ms(&self) -> i64 {
        if let Ok(raw) = env::var(BOUND_MS_ENV) {
            match raw.trim().parse::<i64>() {
                Ok(value) => return value,
                Err(e) => tracing::warn!("Ignoring {BOUND_MS_ENV}={raw:?}: {e}"),
            }
        }
        self.source
            .as_ref()
            .and_then(|s| s.bound_ms)
            .unwrap_or(Self::DEFAULT_BOUND_MS)
    }

    /// Configured headers with `${VAR}` references expanded.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        self.source
            .as_ref()
            .map(|s| {
                s.headers
                    .iter()
                    .map(|(name, value)| (name.clone(), expand_env_vars(value)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Client origin; falls back to the server base URL.
    #[must_use]
    pub fn client_origin(&self) -> String {
        self.client
            .as_ref()
            .and_then(|c| c.origin.clone())
            .unwrap_or_else(|| self.base_url())
    }

    #[must_use]
    pub fn submit_url(&self) -> String {
        let path = self
            .submit
            .as_ref()
            .and_then(|s| s.path.clone())
            .unwrap_or_else(|| Self::DEFAULT_SUBMIT_PATH.to_string());
        join_url(&self.client_origin(), &path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unclosed reference stays literal.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tierfetch").join("config.toml"))
}
