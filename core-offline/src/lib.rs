//! # Offline Core
//!
//! Offline content for the music catalog: a size-bounded LRU cache for
//! streamed media, a TTL'd lyrics cache with negative caching, and a
//! manager for durable, resumable user downloads.
//!
//! All durable state lives behind the `bridge-traits` storage
//! abstractions: media bytes go through [`FileSystemAccess`] and the
//! metadata registries are JSON documents in a [`KeyValueStore`]. Each
//! component serializes its mutations behind one async mutex.
//!
//! [`FileSystemAccess`]: bridge_traits::storage::FileSystemAccess
//! [`KeyValueStore`]: bridge_traits::storage::KeyValueStore

pub mod asset_cache;
pub mod config;
pub mod download;
pub mod error;
pub mod lyrics_cache;

mod registry;

#[cfg(test)]
pub(crate) mod testutil;

pub use asset_cache::{AssetCache, AssetCacheStats, AssetEntry};
pub use config::OfflineConfig;
pub use download::{
    DownloadEntry, DownloadManager, DownloadProgress, DownloadState, StreamResolver,
};
pub use error::{OfflineError, Result};
pub use lyrics_cache::{LyricsCache, LyricsCacheStats, LyricsDoc, LyricsLookup};
