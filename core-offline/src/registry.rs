//! Durable registry persistence.
//!
//! Each cache keeps its metadata table in memory and mirrors it into the
//! key-value store as one JSON document under a fixed key after every
//! mutation. A corrupt or missing document degrades to an empty table so
//! a damaged registry never takes the cache down with it.

use bridge_traits::storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::error::{OfflineError, Result};

pub(crate) struct Registry {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
}

impl Registry {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self { store, key }
    }

    /// Load the registry document, falling back to the default on a
    /// missing key or an unreadable document.
    pub async fn load<T: DeserializeOwned + Default>(&self) -> T {
        let raw = match self.store.get(self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key = self.key, error = %e, "Registry read failed, starting empty");
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = self.key, error = %e, "Registry document corrupt, starting empty");
                T::default()
            }
        }
    }

    /// Persist the registry document, replacing the previous one.
    pub async fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| OfflineError::Storage(format!("Registry serialization failed: {}", e)))?;
        self.store.set(self.key, &raw).await?;
        Ok(())
    }

    /// Persist where failure is tolerable, logging instead of propagating.
    pub async fn save_best_effort<T: Serialize>(&self, value: &T) {
        if let Err(e) = self.save(value).await {
            warn!(key = self.key, error = %e, "Registry write failed");
        }
    }
}
