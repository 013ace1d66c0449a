//! Errors reported by collaborators.
//!
//! The orchestrator never propagates these: every `ToolError` ends up as a
//! log record and an early return at the call site.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("cannot parse `{0}`")]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Command(String),

    #[error("cannot open library `{path}`: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("cannot watch files")]
    Watch(#[from] notify::Error),
}

impl ToolError {
    /// Wrap an `anyhow` error from `utils::exec`.
    pub fn command(err: anyhow::Error) -> Self {
        Self::Command(format!("{err:#}"))
    }

    /// The error and all its sources, `: `-separated.
    pub fn chain(&self) -> String {
        let mut msg = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            msg.push_str(": ");
            msg.push_str(&err.to_string());
            source = err.source();
        }
        msg
    }
}
