//! Offline subsystem configuration.

use core_catalog::StreamQuality;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the offline caches and the download manager.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Byte budget for the media asset cache.
    pub asset_cache_max_bytes: u64,

    /// Byte budget for the lyrics cache (positive and negative entries).
    pub lyrics_cache_max_bytes: u64,

    /// Age after which a lyrics entry expires regardless of size pressure.
    pub lyrics_ttl: Duration,

    /// Directory for user-requested downloads, relative to the app data root.
    pub download_dir: PathBuf,

    /// Minimum interval between two progress reports for one transfer.
    pub progress_interval: Duration,

    /// Audio quality requested when resolving stream URLs.
    pub preferred_quality: StreamQuality,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            asset_cache_max_bytes: 2 * 1024 * 1024 * 1024,
            lyrics_cache_max_bytes: 16 * 1024 * 1024,
            lyrics_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            download_dir: PathBuf::from("downloads"),
            progress_interval: Duration::from_secs(2),
            preferred_quality: StreamQuality::default(),
        }
    }
}

impl OfflineConfig {
    /// Set the media cache budget in bytes.
    pub fn with_asset_cache_max_bytes(mut self, bytes: u64) -> Self {
        self.asset_cache_max_bytes = bytes;
        self
    }

    /// Set the lyrics cache budget in bytes.
    pub fn with_lyrics_cache_max_bytes(mut self, bytes: u64) -> Self {
        self.lyrics_cache_max_bytes = bytes;
        self
    }

    /// Set the lyrics time-to-live.
    pub fn with_lyrics_ttl(mut self, ttl: Duration) -> Self {
        self.lyrics_ttl = ttl;
        self
    }

    /// Set the download directory.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Set the minimum interval between progress reports.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the preferred stream quality for downloads.
    pub fn with_preferred_quality(mut self, quality: StreamQuality) -> Self {
        self.preferred_quality = quality;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.asset_cache_max_bytes == 0 {
            return Err("asset_cache_max_bytes must be greater than zero".to_string());
        }
        if self.lyrics_cache_max_bytes == 0 {
            return Err("lyrics_cache_max_bytes must be greater than zero".to_string());
        }
        if self.lyrics_ttl.is_zero() {
            return Err("lyrics_ttl must be greater than zero".to_string());
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err("download_dir cannot be empty".to_string());
        }
        Ok(())
    }
}
