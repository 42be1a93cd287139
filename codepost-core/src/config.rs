//! Client configuration: API key and base URL.
//!
//! There is no process-wide key cache. Callers resolve a [`ClientConfig`] once
//! and hand it to whatever talks to the API.
//!
//! # Key sources (first hit wins)
//!
//! 1. explicit override (e.g. `--api-key`)
//! 2. `$CP_API_KEY`
//! 3. the first config file that exists among:
//!
//! ```text
//! <cwd>/codepost-config.yaml
//! <cwd>/.codepost-config.yaml
//! <home>/codepost-config.yaml
//! <home>/.codepost-config.yaml
//! <cwd>/../codepost-config.yaml
//! <cwd>/../.codepost-config.yaml
//! ```
//!
//! # API pattern
//!
//! - `discover_at(home, cwd, env, …)` — everything explicit; used in tests with `TempDir`
//! - `discover(…)` — real home, working directory and environment; delegates to `_at`

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "CP_API_KEY";
pub const BASE_URL_VAR: &str = "CP_API_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.codepost.io";
pub const CONFIG_FILE_NAMES: [&str; 2] = ["codepost-config.yaml", ".codepost-config.yaml"];

/// Length of the tokens the platform issues.
pub const API_KEY_LEN: usize = 40;

// ---------------------------------------------------------------------------
// ApiKey
// ---------------------------------------------------------------------------

/// An API token. `Debug` and `Display` only show the first five characters.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The full secret, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Offline plausibility check; does not contact the API.
    pub fn looks_valid(&self) -> bool {
        self.0.chars().count() == API_KEY_LEN
    }

    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(5).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.preview())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Where the API key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Override,
    Environment,
    File(PathBuf),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Override => write!(f, "override"),
            KeySource::Environment => write!(f, "${API_KEY_VAR}"),
            KeySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Everything a client needs to reach the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: ApiKey,
    /// Base URL without a trailing `/`.
    pub base_url: String,
    pub source: KeySource,
}

impl ClientConfig {
    pub fn new(api_key: ApiKey, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: normalize_base_url(&base_url.into()),
            source: KeySource::Override,
        }
    }
}

/// Environment values consulted during discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl EnvVars {
    /// Read `$CP_API_KEY` and `$CP_API_URL` from the current process.
    pub fn from_process() -> Self {
        Self {
            api_key: std::env::var(API_KEY_VAR).ok(),
            base_url: std::env::var(BASE_URL_VAR).ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Config file locations in search order — pure, no I/O.
pub fn candidate_paths(home: &Path, cwd: &Path) -> Vec<PathBuf> {
    let parent = cwd.join("..");
    [cwd, home, parent.as_path()]
        .iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .collect()
}

/// Resolve the client configuration from explicit inputs.
pub fn discover_at(
    home: &Path,
    cwd: &Path,
    env: &EnvVars,
    override_key: Option<&str>,
) -> Result<ClientConfig, ConfigError> {
    let searched = candidate_paths(home, cwd);
    let found = match searched.iter().find(|p| p.is_file()) {
        Some(path) => Some((path.clone(), load_file(path)?)),
        None => None,
    };

    let file_base_url = found.as_ref().and_then(|(_, file)| non_empty(&file.base_url));
    let base_url = non_empty(&env.base_url)
        .or(file_base_url)
        .unwrap_or(DEFAULT_BASE_URL);
    let base_url = normalize_base_url(base_url);

    if let Some(key) = override_key.filter(|k| !k.is_empty()) {
        return Ok(ClientConfig {
            api_key: ApiKey::new(key),
            base_url,
            source: KeySource::Override,
        });
    }

    if let Some(key) = non_empty(&env.api_key) {
        return Ok(ClientConfig {
            api_key: ApiKey::new(key),
            base_url,
            source: KeySource::Environment,
        });
    }

    match found {
        Some((path, file)) => match non_empty(&file.api_key) {
            Some(key) => Ok(ClientConfig {
                api_key: ApiKey::new(key),
                base_url,
                source: KeySource::File(path),
            }),
            None => Err(ConfigError::EmptyApiKey { path }),
        },
        None => Err(ConfigError::MissingApiKey { searched }),
    }
}

/// `discover_at` convenience wrapper for the running process.
pub fn discover(override_key: Option<&str>) -> Result<ClientConfig, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io {
        path: PathBuf::from("."),
        source: e,
    })?;
    discover_at(&home, &cwd, &EnvVars::from_process(), override_key)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn load_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
