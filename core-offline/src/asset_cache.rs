//! Media asset cache.
//!
//! Size-bounded LRU cache for streamed media bytes. Files live under one
//! cache directory with content-addressed names; the metadata table is
//! held in memory behind a single mutex and mirrored into the key-value
//! store after every mutation.

use bridge_traits::http::HttpClient;
use bridge_traits::storage::{FileSystemAccess, KeyValueStore};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::registry::Registry;

const REGISTRY_KEY: &str = "offline/asset_registry";

/// Content-addressed filename: hex SHA-256 of the content id.
pub(crate) fn file_name_for(id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One cached media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub cached_at_epoch_ms: i64,
    pub last_played_epoch_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AssetRegistry {
    entries: HashMap<String, AssetEntry>,
}

impl AssetRegistry {
    fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}

/// Aggregate cache usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetCacheStats {
    pub count: usize,
    pub total_size: u64,
    pub max_size: u64,
}

struct AssetState {
    registry: AssetRegistry,
    max_size_bytes: u64,
    // Recency tick, strictly increasing even within one millisecond.
    tick: i64,
}

impl AssetState {
    fn next_tick(&mut self) -> i64 {
        self.tick = epoch_ms().max(self.tick + 1);
        self.tick
    }
}

/// LRU cache for media bytes.
pub struct AssetCache {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    store: Registry,
    state: Mutex<AssetState>,
    // Ids with a transfer in flight, so two puts never share a partial file.
    active: Mutex<HashSet<String>>,
    base_dir: PathBuf,
}

impl AssetCache {
    /// Open the cache, loading any persisted registry and ensuring the
    /// cache directory exists.
    pub async fn open(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        kv: Arc<dyn KeyValueStore>,
        base_dir: impl Into<PathBuf>,
        max_size_bytes: u64,
    ) -> Result<Self> {
        let base_dir = base_dir.into();
        fs.create_dir_all(&base_dir).await?;

        let store = Registry::new(kv, REGISTRY_KEY);
        let registry: AssetRegistry = store.load().await;
        let tick = registry
            .entries
            .values()
            .map(|e| e.last_played_epoch_ms)
            .max()
            .unwrap_or(0);

        info!(
            entries = registry.entries.len(),
            total_size = registry.total_size(),
            "Asset cache opened"
        );

        Ok(Self {
            http,
            fs,
            store,
            state: Mutex::new(AssetState {
                registry,
                max_size_bytes,
                tick,
            }),
            active: Mutex::new(HashSet::new()),
            base_dir,
        })
    }

    fn path_of(&self, entry: &AssetEntry) -> PathBuf {
        self.base_dir.join(&entry.file_name)
    }

    /// Whether a cached copy is registered for `id`.
    pub async fn has(&self, id: &str) -> bool {
        self.state.lock().await.registry.entries.contains_key(id)
    }

    /// Path to the cached file for `id`, refreshing its recency.
    ///
    /// A registry entry whose file has vanished is dropped here so the
    /// table converges back to reality instead of serving dead paths.
    #[instrument(skip(self))]
    pub async fn path_for(&self, id: &str) -> Option<PathBuf> {
        let mut state = self.state.lock().await;

        let path = {
            let entry = state.registry.entries.get(id)?;
            self.path_of(entry)
        };

        match self.fs.exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(id, "Cached file missing, dropping stale registry entry");
                state.registry.entries.remove(id);
                self.store.save_best_effort(&state.registry).await;
                return None;
            }
            Err(e) => {
                warn!(id, error = %e, "Could not verify cached file");
                return None;
            }
        }

        let tick = state.next_tick();
        if let Some(entry) = state.registry.entries.get_mut(id) {
            entry.last_played_epoch_ms = tick;
        }
        self.store.save_best_effort(&state.registry).await;

        Some(path)
    }

    /// Stream `source_url` into the cache under `id`. Returns whether a
    /// cached copy is registered afterwards.
    ///
    /// An entry that alone exceeds the whole budget is not inserted; the
    /// call still succeeds and returns `false` with the cache unchanged.
    /// Existing entries whose file is still on disk are refreshed, not
    /// re-downloaded; a stale entry is dropped and re-fetched. A put
    /// racing another put for the same id yields to the one in flight.
    #[instrument(skip(self, source_url))]
    pub async fn put(
        &self,
        id: &str,
        title: &str,
        artist: &str,
        source_url: &str,
    ) -> Result<bool> {
        {
            let mut state = self.state.lock().await;
            let path = state.registry.entries.get(id).map(|e| self.path_of(e));
            if let Some(path) = path {
                if self.fs.exists(&path).await.unwrap_or(false) {
                    let tick = state.next_tick();
                    if let Some(entry) = state.registry.entries.get_mut(id) {
                        entry.last_played_epoch_ms = tick;
                    }
                    self.store.save_best_effort(&state.registry).await;
                    return Ok(true);
                }
                warn!(id, "Cached file missing, dropping stale registry entry");
                state.registry.entries.remove(id);
                self.store.save_best_effort(&state.registry).await;
            }
        }

        {
            let mut active = self.active.lock().await;
            if !active.insert(id.to_string()) {
                debug!(id, "Transfer already in flight");
                return Ok(true);
            }
        }

        let result = self.transfer(id, title, artist, source_url).await;
        self.active.lock().await.remove(id);
        result
    }

    async fn transfer(
        &self,
        id: &str,
        title: &str,
        artist: &str,
        source_url: &str,
    ) -> Result<bool> {
        let file_name = file_name_for(id);
        let part_path = self.base_dir.join(format!("{}.part", file_name));
        let final_path = self.base_dir.join(&file_name);

        // The transfer runs outside the lock so reads stay responsive.
        let size_bytes = match self.stream_to(source_url, &part_path).await {
            Ok(size) => size,
            Err(e) => {
                let _ = self.fs.delete_file(&part_path).await;
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;

        if size_bytes > state.max_size_bytes {
            warn!(
                id,
                size_bytes,
                max_size = state.max_size_bytes,
                "Asset exceeds the whole cache budget, not inserting"
            );
            let _ = self.fs.delete_file(&part_path).await;
            return Ok(false);
        }

        self.fs.rename(&part_path, &final_path).await?;

        let tick = state.next_tick();
        state.registry.entries.insert(
            id.to_string(),
            AssetEntry {
                id: id.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                file_name,
                size_bytes,
                cached_at_epoch_ms: epoch_ms(),
                last_played_epoch_ms: tick,
            },
        );

        self.evict_locked(&mut state).await;
        self.store.save(&state.registry).await?;

        debug!(id, size_bytes, "Asset cached");
        Ok(true)
    }

    async fn stream_to(&self, source_url: &str, path: &Path) -> Result<u64> {
        // Drop any leftover partial from an earlier failed transfer.
        let _ = self.fs.delete_file(path).await;

        let mut stream = self.http.download(source_url, None).await?;
        let mut size: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            self.fs.append_file(path, chunk).await?;
        }

        Ok(size)
    }

    /// Evict least-recently-played entries until the cache fits its budget.
    pub async fn evict(&self) {
        let mut state = self.state.lock().await;
        if self.evict_locked(&mut state).await {
            self.store.save_best_effort(&state.registry).await;
        }
    }

    async fn evict_locked(&self, state: &mut AssetState) -> bool {
        let mut evicted = false;

        while state.registry.total_size() > state.max_size_bytes {
            let victim_id = match state
                .registry
                .entries
                .values()
                .min_by_key(|e| e.last_played_epoch_ms)
            {
                Some(entry) => entry.id.clone(),
                None => break,
            };

            if let Some(entry) = state.registry.entries.remove(&victim_id) {
                let path = self.path_of(&entry);
                if let Err(e) = self.fs.delete_file(&path).await {
                    warn!(id = %entry.id, error = %e, "Evicted file could not be deleted");
                }
                info!(id = %entry.id, size_bytes = entry.size_bytes, "Asset evicted");
                evicted = true;
            }
        }

        evicted
    }

    /// Change the byte budget, evicting immediately if the cache no
    /// longer fits.
    #[instrument(skip(self))]
    pub async fn set_max_size(&self, max_size_bytes: u64) {
        let mut state = self.state.lock().await;
        state.max_size_bytes = max_size_bytes;
        self.evict_locked(&mut state).await;
        self.store.save_best_effort(&state.registry).await;
    }

    /// Remove one entry. File deletion is best-effort; the registry entry
    /// always goes.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        if let Some(entry) = state.registry.entries.remove(id) {
            let path = self.path_of(&entry);
            if let Err(e) = self.fs.delete_file(&path).await {
                warn!(id, error = %e, "Cached file could not be deleted");
            }
            self.store.save(&state.registry).await?;
        }

        Ok(())
    }

    /// Drop every entry and its file.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        let entries: Vec<AssetEntry> = state.registry.entries.drain().map(|(_, e)| e).collect();
        for entry in &entries {
            let path = self.path_of(entry);
            if let Err(e) = self.fs.delete_file(&path).await {
                warn!(id = %entry.id, error = %e, "Cached file could not be deleted");
            }
        }

        self.store.save(&state.registry).await?;
        info!(removed = entries.len(), "Asset cache cleared");
        Ok(())
    }

    pub async fn stats(&self) -> AssetCacheStats {
        let state = self.state.lock().await;
        AssetCacheStats {
            count: state.registry.entries.len(),
            total_size: state.registry.total_size(),
            max_size: state.max_size_bytes,
        }
    }

    /// All entries, most recently played first.
    pub async fn list(&self) -> Vec<AssetEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<AssetEntry> = state.registry.entries.values().cloned().collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.last_played_epoch_ms));
        entries
    }
}
