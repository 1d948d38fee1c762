//! Error types
//!
//! Every failure the library can report is a variant of [`Error`]. Per-link
//! failures (`MalformedLink`, `UnsupportedScheme`) are recoverable by batch
//! callers; the rest abort the current generate operation.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The link does not have the shape its scheme requires
    #[error("malformed {scheme} link: {reason}")]
    MalformedLink { scheme: &'static str, reason: String },

    /// The link uses a scheme no parser is registered for
    #[error("unsupported link: {0}")]
    UnsupportedScheme(String),

    /// The template exists but cannot be read or is not a Clash document
    #[error("failed to load template {}: {reason}", path.display())]
    TemplateLoad { path: PathBuf, reason: String },

    /// Assembly was requested without any proxies
    #[error("no proxies to generate a config from")]
    EmptyProxySet,

    /// The output file could not be written
    #[error("failed to write config to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// The generator config file is unreadable or invalid
    #[error("invalid generator config: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn malformed(scheme: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedLink {
            scheme,
            reason: reason.into(),
        }
    }

    pub(crate) fn template(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::TemplateLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a batch caller may skip the offending input and continue
    pub fn is_per_link(&self) -> bool {
        matches!(
            self,
            Error::MalformedLink { .. } | Error::UnsupportedScheme(_)
        )
    }

    /// Process exit code for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::MalformedLink { .. } => 3,
            Error::UnsupportedScheme(_) => 4,
            Error::TemplateLoad { .. } => 5,
            Error::EmptyProxySet => 6,
            Error::Write { .. } | Error::Serialize(_) => 7,
            Error::Config(_) => 8,
        }
    }
}
