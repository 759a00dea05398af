//! Catalog client configuration

use std::time::Duration;

/// Configuration for the catalog client.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog service
    pub base_url: String,

    /// Per-request timeout; callers degrade on failure, so requests must
    /// fail fast rather than hang (default: 8s)
    pub request_timeout: Duration,

    /// Song cap applied when accumulating continuation pages of mix-type
    /// playlists, which otherwise feel unbounded (default: 100)
    pub mix_playlist_song_cap: usize,

    /// Defensive bound on continuation pages fetched in one accumulation
    /// loop, in case the server keeps returning tokens with empty pages
    /// (default: 20)
    pub max_continuation_pages: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://music.youtube.com".to_string(),
            request_timeout: Duration::from_secs(8),
            mix_playlist_song_cap: 100,
            max_continuation_pages: 20,
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service base URL (used by tests to point at fixtures).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the mix-playlist song cap.
    pub fn with_mix_playlist_song_cap(mut self, cap: usize) -> Self {
        self.mix_playlist_song_cap = cap;
        self
    }

    /// Set the defensive continuation-page bound.
    pub fn with_max_continuation_pages(mut self, pages: usize) -> Self {
        self.max_continuation_pages = pages;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url cannot be empty".to_string());
        }
        if self.mix_playlist_song_cap == 0 {
            return Err("mix_playlist_song_cap must be greater than 0".to_string());
        }
        if self.max_continuation_pages == 0 {
            return Err("max_continuation_pages must be greater than 0".to_string());
        }
        Ok(())
    }
}
