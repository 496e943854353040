// src/error.rs
//
// Crate-wide error type. Library code propagates these with `?`; the
// binary wraps them in anyhow for user-facing context.

use std::fmt;
use std::io;

/// Errors surfaced by the trainer, the harness and environment sessions.
#[derive(Debug)]
pub enum Error {
    /// Run-mode string did not parse to a known mode.
    InvalidRunMode(String),
    /// The environment session rejected a lifecycle call.
    Env(String),
    /// Filesystem failure (snapshots, telemetry sinks).
    Io(io::Error),
    /// Snapshot (de)serialization failure.
    Snapshot(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRunMode(mode) => {
                write!(f, "invalid run mode {mode:?} (expected baseline or qlearning)")
            }
            Error::Env(msg) => write!(f, "environment error: {msg}"),
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Snapshot(e) => write!(f, "snapshot error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Snapshot(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Snapshot(e)
    }
}
