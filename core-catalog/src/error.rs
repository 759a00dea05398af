use thiserror::Error;

/// Internal error taxonomy for catalog operations.
///
/// These never cross the public `CatalogClient` boundary: transport and
/// schema failures are recovered into empty/`None` results there. The
/// variants exist so the recovery sites can log what actually went wrong.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<bridge_traits::BridgeError> for CatalogError {
    fn from(e: bridge_traits::BridgeError) -> Self {
        CatalogError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
