//! Error types for codepost-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The kind of resource a store operation was addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Assignment,
    Submission,
    File,
    Comment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Assignment => write!(f, "assignment"),
            ResourceKind::Submission => write!(f, "submission"),
            ResourceKind::File => write!(f, "file"),
            ResourceKind::Comment => write!(f, "comment"),
        }
    }
}

/// Failure of a single resource-store operation.
///
/// Variants mirror the status classes the platform API reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// HTTP 400: the request was malformed or duplicates an existing resource.
    #[error("bad request: {detail}")]
    BadRequest { detail: String },

    /// HTTP 401: missing, expired or invalid API key.
    #[error("authentication failed; check the configured API key")]
    Unauthenticated,

    /// HTTP 403: the key is valid but may not touch this resource.
    #[error("not authorized to access {kind} {id}")]
    Forbidden { kind: ResourceKind, id: u64 },

    /// HTTP 404.
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: u64 },

    /// Any other error status.
    #[error("server returned HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// No response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be decoded.
    #[error("failed to decode {kind} response: {reason}")]
    Decode { kind: ResourceKind, reason: String },
}

/// All errors that can arise while resolving the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but is not valid YAML for the expected shape.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// No API key in the override, the environment, or any config file.
    #[error(
        "no API key found: pass --api-key, set CP_API_KEY, or add api_key to one of {}",
        display_paths(.searched)
    )]
    MissingApiKey { searched: Vec<PathBuf> },

    /// A config file was found but its `api_key` entry is empty.
    #[error("config at {path} has an empty api_key")]
    EmptyApiKey { path: PathBuf },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
