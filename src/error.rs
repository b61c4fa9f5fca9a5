//! Crate-level error type.
//!
//! Network, scope, and match-gate outcomes are never constructed as
//! [`WigError`] — per the error handling design, those are expected probe
//! outcomes and collapse to `Option<Response>` at the requester boundary.
//! `WigError` covers only dispositions that are exceptional at the scan or
//! catalog level.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, WigError>;

#[derive(Debug, thiserror::Error)]
pub enum WigError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to parse fingerprint file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown host {host}")]
    UnknownHost {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scan interrupted")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
