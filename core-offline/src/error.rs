//! Error types for the offline core.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors surfaced by the offline subsystem.
///
/// Only failures of explicit user actions (a download request, a delete)
/// reach callers as `Err`. Housekeeping failures inside eviction or
/// self-healing are logged and absorbed, and cache misses of every kind
/// are ordinary return values, not errors.
#[derive(Debug, Error)]
pub enum OfflineError {
    /// Durable storage (filesystem or key-value) failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network transfer failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The requested content does not exist or has no playable stream.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<BridgeError> for OfflineError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Transport(msg) => OfflineError::Transport(msg),
            other => OfflineError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OfflineError>;
