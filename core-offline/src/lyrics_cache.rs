//! Lyrics cache.
//!
//! Caches lyrics documents and, crucially, confirmed absences: a song
//! known to have no lyrics is remembered so the lookup is not repeated.
//! Entries age out after a TTL; size pressure evicts by recency only
//! after expired entries are gone.

use bridge_traits::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::registry::Registry;

const REGISTRY_KEY: &str = "offline/lyrics_registry";

/// Bookkeeping bytes charged per entry on top of the text itself, so
/// negative entries still occupy budget.
const ENTRY_OVERHEAD_BYTES: u64 = 64;

fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A lyrics document, possibly time-synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsDoc {
    /// Plain text, one line per lyric line.
    pub plain: Option<String>,
    /// LRC-style synced text.
    pub synced: Option<String>,
}

impl LyricsDoc {
    fn approx_size(&self) -> u64 {
        let plain = self.plain.as_deref().map_or(0, str::len) as u64;
        let synced = self.synced.as_deref().map_or(0, str::len) as u64;
        plain + synced
    }
}

/// Outcome of a cache lookup. Distinguishes "never asked" from "asked,
/// and there are none" so callers only hit the network for the former.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsLookup {
    /// No cache entry; the caller should fetch.
    Unknown,
    /// A previous fetch established that no lyrics exist.
    ConfirmedAbsent,
    /// Cached lyrics.
    Found(LyricsDoc),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LyricsEntry {
    id: String,
    title: String,
    artist: String,
    /// `None` records a confirmed absence.
    doc: Option<LyricsDoc>,
    size_bytes: u64,
    stored_epoch_ms: i64,
    last_access_epoch_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LyricsRegistry {
    entries: HashMap<String, LyricsEntry>,
}

impl LyricsRegistry {
    fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.size_bytes).sum()
    }
}

/// Aggregate lyrics cache usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricsCacheStats {
    pub count: usize,
    pub negative_count: usize,
    pub total_size: u64,
    pub max_size: u64,
}

struct LyricsState {
    registry: LyricsRegistry,
    tick: i64,
}

impl LyricsState {
    fn next_tick(&mut self) -> i64 {
        self.tick = epoch_ms().max(self.tick + 1);
        self.tick
    }
}

/// TTL + size bounded cache of lyrics documents and confirmed absences.
pub struct LyricsCache {
    store: Registry,
    state: Mutex<LyricsState>,
    max_size_bytes: u64,
    ttl: Duration,
}

impl LyricsCache {
    pub async fn open(
        kv: Arc<dyn KeyValueStore>,
        max_size_bytes: u64,
        ttl: Duration,
    ) -> Self {
        let store = Registry::new(kv, REGISTRY_KEY);
        let registry: LyricsRegistry = store.load().await;
        let tick = registry
            .entries
            .values()
            .map(|e| e.last_access_epoch_ms)
            .max()
            .unwrap_or(0);

        info!(entries = registry.entries.len(), "Lyrics cache opened");

        Self {
            store,
            state: Mutex::new(LyricsState { registry, tick }),
            max_size_bytes,
            ttl,
        }
    }

    fn ttl_ms(&self) -> i64 {
        self.ttl.as_millis() as i64
    }

    fn is_expired(&self, entry: &LyricsEntry, now_ms: i64) -> bool {
        now_ms.saturating_sub(entry.stored_epoch_ms) > self.ttl_ms()
    }

    /// Look up lyrics for `id`, refreshing recency on a hit.
    ///
    /// Expired entries are dropped lazily here and report as `Unknown`,
    /// forcing a refetch rather than serving stale text.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> LyricsLookup {
        let mut state = self.state.lock().await;

        let now = epoch_ms();
        let expired = match state.registry.entries.get(id) {
            None => return LyricsLookup::Unknown,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            debug!(id, "Lyrics entry expired");
            state.registry.entries.remove(id);
            self.store.save_best_effort(&state.registry).await;
            return LyricsLookup::Unknown;
        }

        let tick = state.next_tick();
        let entry = match state.registry.entries.get_mut(id) {
            Some(entry) => entry,
            None => return LyricsLookup::Unknown,
        };
        entry.last_access_epoch_ms = tick;
        let lookup = match &entry.doc {
            Some(doc) => LyricsLookup::Found(doc.clone()),
            None => LyricsLookup::ConfirmedAbsent,
        };
        self.store.save_best_effort(&state.registry).await;

        lookup
    }

    /// Record a fetch result for `id`. `None` caches the absence.
    ///
    /// An entry that alone exceeds the budget is a no-op insert and
    /// leaves existing entries untouched. Replacing an entry recomputes
    /// its size and resets both its age and its recency. Insertion
    /// sweeps expired entries first, then evicts by recency until the
    /// cache fits.
    #[instrument(skip(self, doc))]
    pub async fn set(
        &self,
        id: &str,
        title: &str,
        artist: &str,
        doc: Option<LyricsDoc>,
    ) -> Result<()> {
        let size_bytes =
            ENTRY_OVERHEAD_BYTES + doc.as_ref().map_or(0, LyricsDoc::approx_size);
        if size_bytes > self.max_size_bytes {
            debug!(id, size_bytes, "Lyrics entry exceeds cache budget, skipping");
            return Ok(());
        }

        let mut state = self.state.lock().await;
        let tick = state.next_tick();

        state.registry.entries.insert(
            id.to_string(),
            LyricsEntry {
                id: id.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                doc,
                size_bytes,
                stored_epoch_ms: tick,
                last_access_epoch_ms: tick,
            },
        );

        // Expired entries go first; only then does size pressure evict
        // live ones by recency.
        let now = epoch_ms();
        state
            .registry
            .entries
            .retain(|_, entry| now.saturating_sub(entry.stored_epoch_ms) <= self.ttl_ms());

        while state.registry.total_size() > self.max_size_bytes {
            let victim = state
                .registry
                .entries
                .values()
                .min_by_key(|e| e.last_access_epoch_ms)
                .map(|e| e.id.clone());
            match victim {
                Some(victim_id) => {
                    debug!(id = %victim_id, "Lyrics entry evicted");
                    state.registry.entries.remove(&victim_id);
                }
                None => break,
            }
        }

        self.store.save(&state.registry).await
    }

    /// Forget the entry for `id`, positive or negative.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.registry.entries.remove(id).is_some() {
            self.store.save(&state.registry).await?;
        }
        Ok(())
    }

    /// Drop every entry.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let removed = state.registry.entries.len();
        state.registry.entries.clear();
        self.store.save(&state.registry).await?;
        info!(removed, "Lyrics cache cleared");
        Ok(())
    }

    pub async fn stats(&self) -> LyricsCacheStats {
        let state = self.state.lock().await;
        LyricsCacheStats {
            count: state.registry.entries.len(),
            negative_count: state
                .registry
                .entries
                .values()
                .filter(|e| e.doc.is_none())
                .count(),
            total_size: state.registry.total_size(),
            max_size: self.max_size_bytes,
        }
    }
}
