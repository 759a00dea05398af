//! Download manager.
//!
//! User-requested, durable downloads. Unlike the asset cache these are
//! never evicted; they exist until the user deletes them. Transfers are
//! resumable: an interrupted or paused transfer leaves its `.part` file
//! behind and the next attempt continues from its byte length with a
//! range request.

use async_trait::async_trait;
use bridge_traits::http::{ByteStream, HttpClient};
use bridge_traits::storage::{FileSystemAccess, KeyValueStore};
use core_catalog::{CatalogClient, Song, StreamQuality};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::asset_cache::file_name_for;
use crate::config::OfflineConfig;
use crate::error::{OfflineError, Result};
use crate::registry::Registry;

const REGISTRY_KEY: &str = "offline/download_registry";
const PROGRESS_CHANNEL_CAPACITY: usize = 32;

fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Resolves a content id to a playable stream URL.
///
/// Seam between the offline core and the catalog so the manager can be
/// tested without a network client. [`CatalogClient`] is the production
/// implementation.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, content_id: &str, quality: StreamQuality) -> Option<String>;
}

#[async_trait]
impl StreamResolver for CatalogClient {
    async fn resolve(&self, content_id: &str, quality: StreamQuality) -> Option<String> {
        self.resolve_stream_url(content_id, quality).await
    }
}

/// Lifecycle of one download. Failure is not a terminal state; a failed
/// transfer reads as `NotDownloaded` and retrying resumes the partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    NotDownloaded,
    Downloading,
    Completed,
}

/// One completed download in the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub file_name: String,
    pub size_bytes: u64,
    pub downloaded_at_epoch_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DownloadRegistry {
    entries: HashMap<String, DownloadEntry>,
}

/// Progress report for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadProgress {
    pub id: String,
    pub received_bytes: u64,
    pub completed: bool,
}

pub struct DownloadManager {
    resolver: Arc<dyn StreamResolver>,
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    store: Registry,
    registry: Mutex<DownloadRegistry>,
    active: Mutex<HashMap<String, CancellationToken>>,
    progress: Mutex<HashMap<String, broadcast::Sender<DownloadProgress>>>,
    config: OfflineConfig,
}

impl DownloadManager {
    /// Open the manager, loading the persisted registry and ensuring the
    /// download directory exists.
    pub async fn open(
        resolver: Arc<dyn StreamResolver>,
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        kv: Arc<dyn KeyValueStore>,
        config: OfflineConfig,
    ) -> Result<Self> {
        config.validate().map_err(OfflineError::Storage)?;
        fs.create_dir_all(&config.download_dir).await?;

        let store = Registry::new(kv, REGISTRY_KEY);
        let registry: DownloadRegistry = store.load().await;

        info!(entries = registry.entries.len(), "Download manager opened");

        Ok(Self {
            resolver,
            http,
            fs,
            store,
            registry: Mutex::new(registry),
            active: Mutex::new(HashMap::new()),
            progress: Mutex::new(HashMap::new()),
            config,
        })
    }

    fn final_path(&self, file_name: &str) -> PathBuf {
        self.config.download_dir.join(file_name)
    }

    fn part_path(&self, file_name: &str) -> PathBuf {
        self.config.download_dir.join(format!("{}.part", file_name))
    }

    /// Download a song to durable storage.
    ///
    /// Completed downloads are a no-op. A partial file left by a pause or
    /// a failure is continued with a range request; if the server then
    /// refuses the range, the partial is discarded and the transfer
    /// restarts from byte zero.
    #[instrument(skip(self, song), fields(id = %song.id))]
    pub async fn download(&self, song: &Song) -> Result<()> {
        let file_name = file_name_for(&song.id);

        {
            let mut registry = self.registry.lock().await;
            if let Some(entry) = registry.entries.get(&song.id) {
                let path = self.final_path(&entry.file_name);
                if self.fs.exists(&path).await.unwrap_or(false) {
                    debug!("Already downloaded");
                    return Ok(());
                }
                warn!("Downloaded file missing, dropping stale registry entry");
                registry.entries.remove(&song.id);
                self.store.save_best_effort(&*registry).await;
            }
        }

        let token = CancellationToken::new();
        {
            let mut active = self.active.lock().await;
            if active.contains_key(&song.id) {
                debug!("Transfer already in flight");
                return Ok(());
            }
            active.insert(song.id.clone(), token.clone());
        }

        let result = self.transfer(song, &file_name, &token).await;
        self.active.lock().await.remove(&song.id);
        result
    }

    async fn transfer(
        &self,
        song: &Song,
        file_name: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let url = self
            .resolver
            .resolve(&song.id, self.config.preferred_quality)
            .await
            .ok_or_else(|| OfflineError::NotFound(format!("No playable stream for {}", song.id)))?;

        self.fs.create_dir_all(&self.config.download_dir).await?;

        let part = self.part_path(file_name);
        let mut offset = match self.fs.metadata(&part).await {
            Ok(meta) => meta.size,
            Err(_) => 0,
        };

        let stream = match self.open_stream(&url, offset).await {
            Ok(stream) => stream,
            Err(e) if offset > 0 => {
                // Server refused the range; start over.
                warn!(error = %e, "Resume rejected, restarting from byte zero");
                self.fs.delete_file(&part).await?;
                offset = 0;
                self.open_stream(&url, 0).await?
            }
            Err(e) => return Err(e),
        };

        if offset > 0 {
            info!(offset, "Resuming partial download");
        }

        let received = self.pump(song, &part, stream, offset, token).await?;
        if token.is_cancelled() {
            info!(received, "Download paused");
            return Ok(());
        }

        let final_path = self.final_path(file_name);
        self.fs.rename(&part, &final_path).await?;

        {
            let mut registry = self.registry.lock().await;
            registry.entries.insert(
                song.id.clone(),
                DownloadEntry {
                    id: song.id.clone(),
                    title: song.title.clone(),
                    artists: song.artists.iter().map(|a| a.name.clone()).collect(),
                    thumbnail_url: song.thumbnail_url.clone(),
                    file_name: file_name.to_string(),
                    size_bytes: received,
                    downloaded_at_epoch_ms: epoch_ms(),
                },
            );
            self.store.save(&*registry).await?;
        }

        self.report(&song.id, received, true).await;
        info!(received, "Download completed");
        Ok(())
    }

    async fn open_stream(&self, url: &str, offset: u64) -> Result<ByteStream> {
        let range_start = (offset > 0).then_some(offset);
        Ok(self.http.download(url, range_start).await?)
    }

    /// Append the stream to the partial file, reporting throttled
    /// progress. Returns the total byte count, or early with the partial
    /// kept when the token fires.
    async fn pump(
        &self,
        song: &Song,
        part: &Path,
        mut stream: ByteStream,
        offset: u64,
        token: &CancellationToken,
    ) -> Result<u64> {
        let mut received = offset;
        let mut last_report = Instant::now();

        loop {
            let chunk = tokio::select! {
                _ = token.cancelled() => {
                    self.report(&song.id, received, false).await;
                    return Ok(received);
                }
                chunk = stream.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    received += bytes.len() as u64;
                    self.fs.append_file(part, bytes).await?;

                    if last_report.elapsed() >= self.config.progress_interval {
                        last_report = Instant::now();
                        self.report(&song.id, received, false).await;
                    }
                }
                Some(Err(e)) => {
                    // Partial file stays for the next attempt.
                    return Err(OfflineError::Transport(e.to_string()));
                }
                None => return Ok(received),
            }
        }
    }

    async fn report(&self, id: &str, received_bytes: u64, completed: bool) {
        let mut progress = self.progress.lock().await;
        if let Some(sender) = progress.get(id) {
            let _ = sender.send(DownloadProgress {
                id: id.to_string(),
                received_bytes,
                completed,
            });
            // Subscribers still drain buffered reports after the sender
            // is gone; the map must not grow without bound.
            if completed || sender.receiver_count() == 0 {
                progress.remove(id);
            }
        }
    }

    /// Subscribe to progress reports for one content id.
    pub async fn subscribe_progress(&self, id: &str) -> broadcast::Receiver<DownloadProgress> {
        let mut progress = self.progress.lock().await;
        progress
            .entry(id.to_string())
            .or_insert_with(|| broadcast::channel(PROGRESS_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Pause an in-flight transfer, keeping its partial file. Returns
    /// whether a transfer was actually running. Calling [`download`]
    /// again resumes it.
    ///
    /// [`download`]: DownloadManager::download
    #[instrument(skip(self))]
    pub async fn pause(&self, id: &str) -> bool {
        let active = self.active.lock().await;
        match active.get(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Delete a download. Cancels any in-flight transfer; file removal is
    /// best-effort, the registry entry always goes.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        if let Some(token) = self.active.lock().await.get(id) {
            token.cancel();
        }

        let file_name = file_name_for(id);
        if let Err(e) = self.fs.delete_file(&self.final_path(&file_name)).await {
            debug!(id, error = %e, "Downloaded file not deleted");
        }
        if let Err(e) = self.fs.delete_file(&self.part_path(&file_name)).await {
            debug!(id, error = %e, "Partial file not deleted");
        }

        self.progress.lock().await.remove(id);

        let mut registry = self.registry.lock().await;
        if registry.entries.remove(id).is_some() {
            self.store.save(&*registry).await?;
        }
        Ok(())
    }

    /// Delete every download. File removal is best-effort per entry; the
    /// registry is cleared unconditionally.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<()> {
        for token in self.active.lock().await.values() {
            token.cancel();
        }
        self.progress.lock().await.clear();

        let mut registry = self.registry.lock().await;
        for entry in registry.entries.values() {
            if let Err(e) = self.fs.delete_file(&self.final_path(&entry.file_name)).await {
                debug!(id = %entry.id, error = %e, "Downloaded file not deleted");
            }
        }
        let removed = registry.entries.len();
        registry.entries.clear();
        self.store.save(&*registry).await?;

        info!(removed, "Downloads cleared");
        Ok(())
    }

    pub async fn is_downloaded(&self, id: &str) -> bool {
        self.registry.lock().await.entries.contains_key(id)
    }

    pub async fn state(&self, id: &str) -> DownloadState {
        if self.registry.lock().await.entries.contains_key(id) {
            return DownloadState::Completed;
        }
        if self.active.lock().await.contains_key(id) {
            return DownloadState::Downloading;
        }
        DownloadState::NotDownloaded
    }

    /// All downloads, newest first.
    pub async fn list(&self) -> Vec<DownloadEntry> {
        let registry = self.registry.lock().await;
        let mut entries: Vec<DownloadEntry> = registry.entries.values().cloned().collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.downloaded_at_epoch_ms));
        entries
    }

    /// Total bytes held by completed downloads.
    pub async fn total_bytes(&self) -> u64 {
        let registry = self.registry.lock().await;
        registry.entries.values().map(|e| e.size_bytes).sum()
    }

    /// Path to the downloaded file for `id`, if completed.
    pub async fn path_for(&self, id: &str) -> Option<PathBuf> {
        let registry = self.registry.lock().await;
        registry
            .entries
            .get(id)
            .map(|entry| self.final_path(&entry.file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{byte_stream, MemoryFs, MemoryKv, MockHttp};
    use bridge_traits::error::BridgeError;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedResolver {
        url: Option<String>,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(url: Option<&str>) -> Self {
            Self {
                url: url.map(str::to_string),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StreamResolver for FixedResolver {
        async fn resolve(&self, _content_id: &str, _quality: StreamQuality) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.url.clone()
        }
    }

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            title: "Title".to_string(),
            artists: vec![core_catalog::Artist {
                id: "UCx".to_string(),
                name: "Artist".to_string(),
            }],
            duration_ms: 180_000,
            thumbnail_url: None,
        }
    }

    fn config() -> OfflineConfig {
        OfflineConfig::default()
            .with_download_dir("/downloads")
            .with_progress_interval(Duration::from_millis(0))
    }

    async fn manager(
        resolver: FixedResolver,
        http: MockHttp,
        fs: Arc<MemoryFs>,
        kv: Arc<MemoryKv>,
    ) -> DownloadManager {
        DownloadManager::open(Arc::new(resolver), Arc::new(http), fs, kv, config())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn download_writes_file_and_registry() {
        let mut http = MockHttp::new();
        http.expect_download().times(1).returning(|_, range| {
            assert!(range.is_none());
            Ok(byte_stream(vec![
                Ok(Bytes::from_static(b"abc")),
                Ok(Bytes::from_static(b"def")),
            ]))
        });

        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs.clone(),
            Arc::new(MemoryKv::new()),
        )
        .await;

        manager.download(&song("s1")).await.unwrap();

        assert!(manager.is_downloaded("s1").await);
        assert_eq!(manager.state("s1").await, DownloadState::Completed);
        assert_eq!(manager.total_bytes().await, 6);

        let path = manager.path_for("s1").await.unwrap();
        assert_eq!(fs.contents(&path).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn completed_download_is_a_noop() {
        let mut http = MockHttp::new();
        http.expect_download()
            .times(1)
            .returning(|_, _| Ok(byte_stream(vec![Ok(Bytes::from_static(b"abc"))])));

        let fs = Arc::new(MemoryFs::new());
        let resolver = Arc::new(FixedResolver::new(Some("https://cdn/a")));
        let manager = DownloadManager::open(
            resolver.clone(),
            Arc::new(http),
            fs,
            Arc::new(MemoryKv::new()),
            config(),
        )
        .await
        .unwrap();

        manager.download(&song("s1")).await.unwrap();
        manager.download(&song("s1")).await.unwrap();

        // the second call never reached the resolver
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    const FULL: &[u8] = b"0123456789";

    #[tokio::test]
    async fn interrupted_download_resumes_byte_identical() {
        let mut http = MockHttp::new();
        http.expect_download().times(2).returning(|_, range| {
            match range {
                // first attempt: four bytes, then the connection drops
                None => Ok(byte_stream(vec![
                    Ok(Bytes::from_static(&FULL[..4])),
                    Err(BridgeError::Transport("reset".into())),
                ])),
                // retry: remainder from byte four
                Some(4) => Ok(byte_stream(vec![Ok(Bytes::from_static(&FULL[4..]))])),
                Some(other) => panic!("unexpected range start {}", other),
            }
        });

        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs.clone(),
            Arc::new(MemoryKv::new()),
        )
        .await;

        let s = song("s1");
        assert!(manager.download(&s).await.is_err());
        assert!(!manager.is_downloaded("s1").await);

        manager.download(&s).await.unwrap();

        let path = manager.path_for("s1").await.unwrap();
        assert_eq!(fs.contents(&path).unwrap(), FULL);
    }

    #[tokio::test]
    async fn pause_keeps_partial_and_resume_completes() {
        let mut http = MockHttp::new();
        http.expect_download().times(2).returning(|_, range| match range {
            // first attempt: four bytes arrive, then the stream stalls
            None => {
                let head = futures::stream::iter(vec![Ok::<Bytes, BridgeError>(
                    Bytes::from_static(&FULL[..4]),
                )]);
                Ok(Box::new(head.chain(futures::stream::pending())) as ByteStream)
            }
            Some(4) => Ok(byte_stream(vec![Ok(Bytes::from_static(&FULL[4..]))])),
            Some(other) => panic!("unexpected range start {}", other),
        });

        let fs = Arc::new(MemoryFs::new());
        let manager = Arc::new(
            DownloadManager::open(
                Arc::new(FixedResolver::new(Some("https://cdn/a"))),
                Arc::new(http),
                fs.clone(),
                Arc::new(MemoryKv::new()),
                config(),
            )
            .await
            .unwrap(),
        );

        let task = tokio::spawn({
            let manager = manager.clone();
            let s = song("s1");
            async move { manager.download(&s).await }
        });

        // let the transfer reach the stall, then pause it
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.pause("s1").await);
        task.await.unwrap().unwrap();

        assert!(!manager.is_downloaded("s1").await);
        assert_eq!(manager.state("s1").await, DownloadState::NotDownloaded);

        manager.download(&song("s1")).await.unwrap();

        let path = manager.path_for("s1").await.unwrap();
        assert_eq!(fs.contents(&path).unwrap(), FULL);
    }

    #[tokio::test]
    async fn rejected_range_restarts_from_zero() {
        let mut http = MockHttp::new();
        http.expect_download().times(3).returning(|_, range| match range {
            None => Ok(byte_stream(vec![
                Ok(Bytes::from_static(b"old")),
                Err(BridgeError::Transport("reset".into())),
            ])),
            Some(_) => Err(BridgeError::Transport("Range not honoured: HTTP 200".into())),
        });

        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs.clone(),
            Arc::new(MemoryKv::new()),
        )
        .await;

        let s = song("s1");
        assert!(manager.download(&s).await.is_err());

        // retry: range refused, then the fallback full fetch also fails
        // because the mock keeps erroring range requests only; the second
        // plain fetch drops again after "old"
        assert!(manager.download(&s).await.is_err());

        // the partial was discarded when the range was refused, so the
        // file now holds exactly the restarted prefix
        let part = manager.part_path(&file_name_for("s1"));
        assert_eq!(fs.contents(&part).unwrap(), b"old");
    }

    #[tokio::test]
    async fn missing_stream_is_not_found() {
        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(None),
            MockHttp::new(),
            fs,
            Arc::new(MemoryKv::new()),
        )
        .await;

        let result = manager.download(&song("s1")).await;
        assert!(matches!(result, Err(OfflineError::NotFound(_))));
    }

    #[tokio::test]
    async fn progress_reports_end_with_completion() {
        let mut http = MockHttp::new();
        http.expect_download().returning(|_, _| {
            Ok(byte_stream(vec![
                Ok(Bytes::from_static(b"aa")),
                Ok(Bytes::from_static(b"bb")),
            ]))
        });

        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs,
            Arc::new(MemoryKv::new()),
        )
        .await;

        let mut progress = manager.subscribe_progress("s1").await;
        manager.download(&song("s1")).await.unwrap();

        let mut reports = Vec::new();
        while let Ok(report) = progress.try_recv() {
            reports.push(report);
        }

        let last = reports.last().unwrap();
        assert!(last.completed);
        assert_eq!(last.received_bytes, 4);
    }

    #[tokio::test]
    async fn progress_sender_does_not_outlive_its_download() {
        let mut http = MockHttp::new();
        http.expect_download()
            .returning(|_, _| Ok(byte_stream(vec![Ok(Bytes::from_static(b"abc"))])));

        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs,
            Arc::new(MemoryKv::new()),
        )
        .await;

        let _rx = manager.subscribe_progress("s1").await;
        manager.download(&song("s1")).await.unwrap();
        assert!(!manager.progress.lock().await.contains_key("s1"));

        let _rx = manager.subscribe_progress("s1").await;
        manager.delete("s1").await.unwrap();
        assert!(!manager.progress.lock().await.contains_key("s1"));
    }

    #[tokio::test]
    async fn delete_removes_file_and_entry() {
        let mut http = MockHttp::new();
        http.expect_download()
            .returning(|_, _| Ok(byte_stream(vec![Ok(Bytes::from_static(b"abc"))])));

        let fs = Arc::new(MemoryFs::new());
        let manager = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs.clone(),
            Arc::new(MemoryKv::new()),
        )
        .await;

        manager.download(&song("s1")).await.unwrap();
        let path = manager.path_for("s1").await.unwrap();

        manager.delete("s1").await.unwrap();

        assert!(!manager.is_downloaded("s1").await);
        assert!(fs.contents(&path).is_none());
    }

    #[tokio::test]
    async fn registry_survives_reopen() {
        let mut http = MockHttp::new();
        http.expect_download()
            .returning(|_, _| Ok(byte_stream(vec![Ok(Bytes::from_static(b"abc"))])));

        let fs = Arc::new(MemoryFs::new());
        let kv = Arc::new(MemoryKv::new());

        let manager1 = manager(
            FixedResolver::new(Some("https://cdn/a")),
            http,
            fs.clone(),
            kv.clone(),
        )
        .await;
        manager1.download(&song("s1")).await.unwrap();
        drop(manager1);

        let manager2 = manager(FixedResolver::new(None), MockHttp::new(), fs, kv).await;
        assert!(manager2.is_downloaded("s1").await);
        assert_eq!(manager2.total_bytes().await, 3);
    }
}
