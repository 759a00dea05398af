//! Catalog client
//!
//! Stateless façade over the remote catalog service. Owns no mutable
//! state; the identity-profile table is a read-only constant, so any
//! number of operations can run concurrently.
//!
//! Every public operation is total: transport and parse failures are
//! logged and recovered into empty or `None` results, because upstream
//! schema instability is the normal operating condition here, not an
//! exceptional one.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use bridge_traits::http::{HttpClient, HttpRequest};

use crate::config::CatalogConfig;
use crate::context::{
    request_context, ClientProfile, StreamQuality, BROWSE_PROFILE, STREAM_PROFILES,
};
use crate::error::{CatalogError, Result};
use crate::normalize::{self, FragmentShape};
use crate::types::{
    Album, AlbumPage, Artist, ArtistPage, ContinuationToken, HomeFeed, Paged, Playlist,
    PlaylistPage, SearchFilter, SearchResults, Section, SectionItem, Song,
};

/// Search filter parameter blobs, observed from the service.
fn filter_params(filter: SearchFilter) -> &'static str {
    match filter {
        SearchFilter::Songs => "EgWKAQIIAWoKEAkQBRAKEAMQBA%3D%3D",
        SearchFilter::Albums => "EgWKAQIYAWoKEAkQBRAKEAMQBA%3D%3D",
        SearchFilter::Artists => "EgWKAQIgAWoKEAkQBRAKEAMQBA%3D%3D",
        SearchFilter::Playlists => "EgWKAQIoAWoKEAkQBRAKEAMQBA%3D%3D",
    }
}

/// Client for the remote music catalog.
pub struct CatalogClient {
    http: Arc<dyn HttpClient>,
    config: CatalogConfig,
}

impl CatalogClient {
    pub fn new(http: Arc<dyn HttpClient>, config: CatalogConfig) -> Self {
        Self { http, config }
    }

    pub fn with_defaults(http: Arc<dyn HttpClient>) -> Self {
        Self::new(http, CatalogConfig::default())
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    /// POST to an API endpoint under the given identity profile.
    async fn post_api(
        &self,
        endpoint: &str,
        profile: &ClientProfile,
        mut body: Value,
    ) -> Result<Value> {
        body["context"] = request_context(profile);

        let url = format!(
            "{}/youtubei/v1/{}?prettyPrint=false",
            self.config.base_url, endpoint
        );

        let request = HttpRequest::post(&url)
            .header("User-Agent", profile.user_agent)
            .header("Origin", &self.config.base_url)
            .json(&body)
            .map_err(|e| CatalogError::Schema(e.to_string()))?
            .timeout(self.config.request_timeout);

        let response = self.http.execute(request).await?;

        if !response.is_success() {
            return Err(CatalogError::Transport(format!(
                "{}: HTTP {}",
                endpoint, response.status
            )));
        }

        response
            .json::<Value>()
            .map_err(|e| CatalogError::Schema(format!("{}: {}", endpoint, e)))
    }

    async fn browse(&self, body: Value) -> Result<Value> {
        self.post_api("browse", &BROWSE_PROFILE, body).await
    }

    // -----------------------------------------------------------------------
    // Response walking
    // -----------------------------------------------------------------------

    /// The section list of a browse response, covering both the initial
    /// and the continuation envelope.
    fn section_list(root: &Value) -> Option<&Value> {
        root.get("contents")
            .and_then(|c| c.get("sectionListRenderer"))
            .or_else(|| {
                root.get("continuationContents")
                    .and_then(|c| c.get("sectionListContinuation"))
            })
    }

    /// First continuation token attached to a listing node.
    fn continuation_of(node: &Value) -> Option<ContinuationToken> {
        let token = node
            .get("continuations")?
            .as_array()?
            .first()?
            .get("nextContinuationData")?
            .get("continuation")?
            .as_str()?;
        Some(ContinuationToken::new(token))
    }

    /// Convert one shelf renderer into a [`Section`]. Shelves come in two
    /// renderer variants carrying the two fragment shapes.
    fn section_from_shelf(shelf: &Value) -> Option<Section> {
        let (body, shape, title) = if let Some(s) = shelf.get("musicShelfRenderer") {
            let title = s.get("title").and_then(|t| {
                t.get("runs")?.as_array()?.first()?.get("text")?.as_str()
            });
            (s, FragmentShape::ListItem, title)
        } else if let Some(s) = shelf.get("musicCarouselShelfRenderer") {
            let title = s
                .get("header")
                .and_then(|h| h.get("musicCarouselShelfBasicHeaderRenderer"))
                .and_then(|h| h.get("title"))
                .and_then(|t| t.get("runs")?.as_array()?.first()?.get("text")?.as_str());
            (s, FragmentShape::TwoRow, title)
        } else {
            return None;
        };

        let items = body
            .get("contents")
            .and_then(Value::as_array)
            .map(|contents| {
                contents
                    .iter()
                    .filter_map(|wrapper| Self::fragment_of(shape, wrapper))
                    .filter_map(|fragment| normalize::section_item_from_fragment(shape, fragment))
                    .collect()
            })
            .unwrap_or_default();

        Some(Section {
            title: title.unwrap_or_default().to_string(),
            items,
            more_token: Self::continuation_of(body),
        })
    }

    fn fragment_of(shape: FragmentShape, wrapper: &Value) -> Option<&Value> {
        match shape {
            FragmentShape::ListItem => wrapper.get("musicResponsiveListItemRenderer"),
            FragmentShape::TwoRow => wrapper.get("musicTwoRowItemRenderer"),
        }
    }

    fn sections_of(root: &Value) -> Vec<Section> {
        Self::section_list(root)
            .and_then(|list| list.get("contents"))
            .and_then(Value::as_array)
            .map(|shelves| shelves.iter().filter_map(Self::section_from_shelf).collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Best-effort search suggestions; failures yield an empty list.
    #[instrument(skip(self))]
    pub async fn search_suggestions(&self, query: &str) -> Vec<String> {
        let body = json!({ "input": query });
        let root = match self
            .post_api("music/get_search_suggestions", &BROWSE_PROFILE, body)
            .await
        {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Search suggestions failed");
                return Vec::new();
            }
        };

        Self::suggestions_of(&root)
    }

    fn suggestions_of(root: &Value) -> Vec<String> {
        let Some(sections) = root.get("contents").and_then(Value::as_array) else {
            return Vec::new();
        };

        sections
            .iter()
            .filter_map(|s| {
                s.get("searchSuggestionsSectionRenderer")?
                    .get("contents")?
                    .as_array()
            })
            .flatten()
            .filter_map(|entry| {
                let runs = entry
                    .get("searchSuggestionRenderer")?
                    .get("suggestion")?
                    .get("runs")?
                    .as_array()?;
                let text: String = runs
                    .iter()
                    .filter_map(|r| r.get("text").and_then(Value::as_str))
                    .collect();
                (!text.is_empty()).then_some(text)
            })
            .collect()
    }

    /// Unfiltered search, bucketing result entities by kind. Malformed
    /// fragments are dropped silently.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> SearchResults {
        let root = match self.post_api("search", &BROWSE_PROFILE, json!({ "query": query })).await
        {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Search failed");
                return SearchResults::default();
            }
        };

        let mut results = SearchResults::default();
        for section in Self::sections_of(&root) {
            for item in section.items {
                match item {
                    SectionItem::Song(s) => results.songs.push(s),
                    SectionItem::Album(a) => results.albums.push(a),
                    SectionItem::Artist(a) => results.artists.push(a),
                    SectionItem::Playlist(p) => results.playlists.push(p),
                }
            }
        }
        results
    }

    /// Filtered search returning a flat list of one entity kind.
    #[instrument(skip(self))]
    pub async fn search_filtered(&self, query: &str, filter: SearchFilter) -> Vec<SectionItem> {
        let body = json!({ "query": query, "params": filter_params(filter) });
        let root = match self.post_api("search", &BROWSE_PROFILE, body).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Filtered search failed");
                return Vec::new();
            }
        };

        Self::sections_of(&root)
            .into_iter()
            .flat_map(|s| s.items)
            .filter(|item| {
                matches!(
                    (filter, item),
                    (SearchFilter::Songs, SectionItem::Song(_))
                        | (SearchFilter::Albums, SectionItem::Album(_))
                        | (SearchFilter::Artists, SectionItem::Artist(_))
                        | (SearchFilter::Playlists, SectionItem::Playlist(_))
                )
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Home feed
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_home(&self) -> HomeFeed {
        match self.browse(json!({ "browseId": "FEmusic_home" })).await {
            Ok(root) => Self::home_of(&root),
            Err(e) => {
                warn!(error = %e, "Home feed failed");
                HomeFeed::default()
            }
        }
    }

    #[instrument(skip(self, token))]
    pub async fn get_home_continuation(&self, token: &ContinuationToken) -> HomeFeed {
        match self.browse(json!({ "continuation": token.as_str() })).await {
            Ok(root) => Self::home_of(&root),
            Err(e) => {
                warn!(error = %e, "Home continuation failed");
                HomeFeed::default()
            }
        }
    }

    fn home_of(root: &Value) -> HomeFeed {
        let sections = Self::sections_of(root);

        // Convenience for callers: any shelf titled like "Quick picks"
        // doubles as a flat song list. Computed here, not a server concept.
        let quick_picks = sections
            .iter()
            .filter(|s| s.title.to_lowercase().contains("quick"))
            .flat_map(|s| s.items.iter())
            .filter_map(|item| item.as_song().cloned())
            .collect();

        let continuation = Self::section_list(root).and_then(Self::continuation_of);

        HomeFeed {
            sections,
            quick_picks,
            continuation,
        }
    }

    // -----------------------------------------------------------------------
    // Artist
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_artist(&self, channel_id: &str) -> Option<ArtistPage> {
        let root = match self.browse(json!({ "browseId": channel_id })).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, channel_id, "Artist browse failed");
                return None;
            }
        };

        let header = root.get("header")?.get("musicImmersiveHeaderRenderer")?;
        let name = header
            .get("title")?
            .get("runs")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()?;

        let description = header
            .get("description")
            .and_then(|d| d.get("runs")?.as_array()?.first()?.get("text")?.as_str())
            .map(str::to_string);

        Some(ArtistPage {
            artist: Artist {
                id: channel_id.to_string(),
                name: name.to_string(),
            },
            description,
            sections: Self::sections_of(&root),
        })
    }

    /// Deeper listing behind a shelf's "more" link on an artist page.
    #[instrument(skip(self))]
    pub async fn get_artist_items(
        &self,
        browse_id: &str,
        params: Option<&str>,
    ) -> Paged<SectionItem> {
        let mut body = json!({ "browseId": browse_id });
        if let Some(p) = params {
            body["params"] = json!(p);
        }

        let root = match self.browse(body).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, browse_id, "Artist items browse failed");
                return Paged::empty();
            }
        };

        let mut sections = Self::sections_of(&root);
        if sections.is_empty() {
            return Paged::empty();
        }
        let section = sections.remove(0);

        Paged {
            items: section.items,
            continuation: section.more_token,
        }
    }

    // -----------------------------------------------------------------------
    // Album
    // -----------------------------------------------------------------------

    /// Album lookup is two-phase: fetch metadata by the album's browse id,
    /// then fetch the track listing via a secondary playlist id extracted
    /// from the canonical URL in the first response. Phase two's id only
    /// exists once phase one completes, so the phases are sequential by
    /// necessity.
    #[instrument(skip(self))]
    pub async fn get_album(&self, album_id: &str) -> Option<AlbumPage> {
        let root = match self.browse(json!({ "browseId": album_id })).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, album_id, "Album browse failed");
                return None;
            }
        };

        let header = root.get("header")?.get("musicDetailHeaderRenderer")?;
        let title = header
            .get("title")?
            .get("runs")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()?;

        let subtitle = header.get("subtitle");
        let artists = subtitle.map(normalize::artists_from_runs).unwrap_or_default();
        let year = subtitle
            .and_then(|s| s.get("runs")?.as_array()?.last()?.get("text")?.as_str())
            .and_then(|t| t.trim().parse::<i32>().ok());

        let thumbnail_url = header
            .get("thumbnail")
            .and_then(|t| t.get("musicThumbnailRenderer")?.get("thumbnail")?.get("thumbnails"))
            .and_then(normalize::thumbnail_from_candidates);

        let album = Album {
            id: album_id.to_string(),
            title: title.to_string(),
            artists,
            year,
            thumbnail_url,
        };

        // Phase two. A missing canonical URL leaves the album browsable
        // with an empty track listing rather than failing the lookup.
        let songs = match Self::tracklist_browse_id(&root) {
            Some(playlist_browse_id) => {
                self.collect_playlist_songs(&playlist_browse_id, usize::MAX).await
            }
            None => {
                warn!(album_id, "Album response carried no canonical playlist URL");
                Vec::new()
            }
        };

        Some(AlbumPage { album, songs })
    }

    /// Secondary browse id for an album's track listing, derived from the
    /// `list=` parameter of the canonical URL.
    fn tracklist_browse_id(root: &Value) -> Option<String> {
        let url = root
            .get("microformat")?
            .get("microformatDataRenderer")?
            .get("urlCanonical")?
            .as_str()?;

        let list = url.split_once("list=")?.1;
        let list = list.split('&').next().unwrap_or(list);
        if list.is_empty() {
            return None;
        }
        Some(format!("VL{}", list))
    }

    // -----------------------------------------------------------------------
    // Playlist
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn get_playlist(&self, playlist_id: &str) -> Option<PlaylistPage> {
        let browse_id = if playlist_id.starts_with("VL") {
            playlist_id.to_string()
        } else {
            format!("VL{}", playlist_id)
        };

        let root = match self.browse(json!({ "browseId": browse_id })).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, playlist_id, "Playlist browse failed");
                return None;
            }
        };

        let header = root.get("header")?.get("musicDetailHeaderRenderer")?;
        let title = header
            .get("title")?
            .get("runs")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()?;

        let thumbnail_url = header
            .get("thumbnail")
            .and_then(|t| t.get("musicThumbnailRenderer")?.get("thumbnail")?.get("thumbnails"))
            .and_then(normalize::thumbnail_from_candidates);

        let playlist = Playlist {
            id: normalize::playlist_id_from_browse_id(playlist_id).to_string(),
            title: title.to_string(),
            thumbnail_url,
        };

        // Mix-type (radio) playlists paginate without end; cap them so the
        // listing stays bounded. Regular playlists accumulate fully.
        let cap = if normalize::is_mix_playlist_id(&playlist.id) {
            self.config.mix_playlist_song_cap
        } else {
            usize::MAX
        };

        let mut songs = Self::playlist_page_of(&root);
        let mut pages = 1usize;

        while let Some(token) = songs.continuation.clone() {
            if songs.items.len() >= cap || pages >= self.config.max_continuation_pages {
                break;
            }
            let next = self.get_playlist_continuation(&token).await;
            songs.items.extend(next.items);
            songs.continuation = next.continuation;
            pages += 1;
        }

        if songs.items.len() > cap {
            songs.items.truncate(cap);
        }

        Some(PlaylistPage { playlist, songs })
    }

    /// Fetch one continuation page of a playlist's track listing.
    ///
    /// `continuation == None` in the result means the listing is
    /// exhausted; an empty page with a token is a legitimate intermediate
    /// state and callers must keep following the token.
    #[instrument(skip(self, token))]
    pub async fn get_playlist_continuation(&self, token: &ContinuationToken) -> Paged<Song> {
        let root = match self.browse(json!({ "continuation": token.as_str() })).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Playlist continuation failed");
                return Paged::empty();
            }
        };

        Self::playlist_page_of(&root)
    }

    /// Track shelf of a playlist response (initial or continuation form).
    fn playlist_shelf(root: &Value) -> Option<&Value> {
        if let Some(shelf) = root
            .get("continuationContents")
            .and_then(|c| c.get("musicPlaylistShelfContinuation"))
        {
            return Some(shelf);
        }

        Self::section_list(root)?
            .get("contents")?
            .as_array()?
            .iter()
            .find_map(|s| s.get("musicPlaylistShelfRenderer"))
    }

    fn playlist_page_of(root: &Value) -> Paged<Song> {
        let Some(shelf) = Self::playlist_shelf(root) else {
            return Paged::empty();
        };

        let items = shelf
            .get("contents")
            .and_then(Value::as_array)
            .map(|contents| {
                contents
                    .iter()
                    .filter_map(|w| w.get("musicResponsiveListItemRenderer"))
                    .filter_map(|f| normalize::song_from_fragment(FragmentShape::ListItem, f))
                    .collect()
            })
            .unwrap_or_default();

        Paged {
            items,
            continuation: Self::continuation_of(shelf),
        }
    }

    /// Accumulate a track listing starting from a browse id, following
    /// continuations up to `cap` songs and the defensive page bound.
    async fn collect_playlist_songs(&self, browse_id: &str, cap: usize) -> Vec<Song> {
        let root = match self.browse(json!({ "browseId": browse_id })).await {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, browse_id, "Track listing browse failed");
                return Vec::new();
            }
        };

        let mut page = Self::playlist_page_of(&root);
        let mut pages = 1usize;

        while let Some(token) = page.continuation.clone() {
            if page.items.len() >= cap || pages >= self.config.max_continuation_pages {
                break;
            }
            let next = self.get_playlist_continuation(&token).await;
            page.items.extend(next.items);
            page.continuation = next.continuation;
            pages += 1;
        }

        if page.items.len() > cap {
            page.items.truncate(cap);
        }
        page.items
    }

    // -----------------------------------------------------------------------
    // Stream resolution
    // -----------------------------------------------------------------------

    /// Resolve a playable audio URL for a content id.
    ///
    /// Iterates the identity profiles in fixed order, one request per
    /// profile, strictly sequentially. Stream permissions are
    /// profile-dependent and drift over time, so a failing profile must
    /// not abort the sequence; only exhausting all of them yields `None`.
    #[instrument(skip(self))]
    pub async fn resolve_stream_url(
        &self,
        content_id: &str,
        quality: StreamQuality,
    ) -> Option<String> {
        for profile in &STREAM_PROFILES {
            let body = json!({
                "videoId": content_id,
                "contentCheckOk": true,
                "racyCheckOk": true,
            });

            match self.post_api("player", profile, body).await {
                Ok(root) => {
                    if let Some(url) = Self::playable_url(&root, quality) {
                        debug!(profile = profile.name, content_id, "Stream resolved");
                        return Some(url);
                    }
                    debug!(
                        profile = profile.name,
                        content_id, "Profile yielded no playable audio URL"
                    );
                }
                Err(e) => {
                    warn!(profile = profile.name, error = %e, "Player request failed");
                }
            }
        }

        warn!(content_id, "All identity profiles exhausted");
        None
    }

    /// Playable audio URL from a player response, selected by quality.
    fn playable_url(root: &Value, quality: StreamQuality) -> Option<String> {
        let status = root.get("playabilityStatus")?.get("status")?.as_str()?;
        if status != "OK" {
            return None;
        }

        let formats = root.get("streamingData")?.get("adaptiveFormats")?.as_array()?;

        let mut audio: Vec<(&str, i64)> = formats
            .iter()
            .filter_map(|f| {
                let mime = f.get("mimeType")?.as_str()?;
                if !mime.starts_with("audio/") {
                    return None;
                }
                let url = f.get("url")?.as_str()?;
                let bitrate = f.get("bitrate").and_then(Value::as_i64).unwrap_or(0);
                Some((url, bitrate))
            })
            .collect();

        if audio.is_empty() {
            return None;
        }
        audio.sort_by_key(|(_, bitrate)| *bitrate);

        let index = match quality {
            StreamQuality::Low => 0,
            StreamQuality::Medium => audio.len() / 2,
            StreamQuality::High => audio.len() - 1,
        };
        Some(audio[index].0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::{ByteStream, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use mockall::predicate::always;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(
                &self,
                request: HttpRequest,
            ) -> bridge_traits::error::Result<HttpResponse>;

            async fn download(
                &self,
                url: &str,
                range_start: Option<u64>,
            ) -> bridge_traits::error::Result<ByteStream>;
        }
    }

    fn ok_json(v: Value) -> bridge_traits::error::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(serde_json::to_vec(&v).unwrap()),
        })
    }

    fn body_of(request: &HttpRequest) -> Value {
        serde_json::from_slice(request.body.as_ref().unwrap()).unwrap()
    }

    fn client(http: MockHttp) -> CatalogClient {
        CatalogClient::new(Arc::new(http), CatalogConfig::default())
    }

    fn song_fragment(video_id: &str, title: &str) -> Value {
        json!({ "musicResponsiveListItemRenderer": {
            "playlistItemData": { "videoId": video_id },
            "flexColumns": [
                { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [
                    { "text": title }
                ]}}},
                { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [
                    { "text": "Artist",
                      "navigationEndpoint": { "browseEndpoint": { "browseId": "UCartist" }}}
                ]}}}
            ]
        }})
    }

    fn shelf_response(items: Vec<Value>, continuation: Option<&str>) -> Value {
        let mut shelf = json!({ "contents": items });
        if let Some(token) = continuation {
            shelf["continuations"] =
                json!([{ "nextContinuationData": { "continuation": token }}]);
        }
        json!({ "contents": { "sectionListRenderer": { "contents": [
            { "musicShelfRenderer": shelf }
        ]}}})
    }

    #[tokio::test]
    async fn search_drops_malformed_fragments() {
        let valid = song_fragment("vid1", "Foo Song");
        // malformed: fragment with no id and no title path
        let malformed = json!({ "musicResponsiveListItemRenderer": { "badKey": 1 } });

        let mut http = MockHttp::new();
        http.expect_execute()
            .with(always())
            .times(1)
            .returning(move |_| ok_json(shelf_response(vec![valid.clone(), malformed.clone()], None)));

        let results = client(http).search("foo").await;
        assert_eq!(results.songs.len(), 1);
        assert_eq!(results.songs[0].title, "Foo Song");
        assert!(results.albums.is_empty());
    }

    #[tokio::test]
    async fn search_recovers_transport_failure_as_empty() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Transport("connection refused".into())));

        let results = client(http).search("foo").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn suggestions_on_parse_failure_are_empty() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(b"not json"),
            })
        });

        assert!(client(http).search_suggestions("fo").await.is_empty());
    }

    #[tokio::test]
    async fn suggestions_parse_runs() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            ok_json(json!({ "contents": [
                { "searchSuggestionsSectionRenderer": { "contents": [
                    { "searchSuggestionRenderer": { "suggestion": { "runs": [
                        { "text": "foo" }, { "text": " fighters" }
                    ]}}}
                ]}}
            ]}))
        });

        let suggestions = client(http).search_suggestions("foo").await;
        assert_eq!(suggestions, vec!["foo fighters".to_string()]);
    }

    #[tokio::test]
    async fn playlist_continuation_terminates_after_two_pages() {
        let mut http = MockHttp::new();

        http.expect_execute().times(2).returning(|request| {
            let body = body_of(&request);
            if body.get("continuation").is_none() {
                // page 1: playlist browse with a token
                ok_json(json!({
                    "header": { "musicDetailHeaderRenderer": { "title": { "runs": [
                        { "text": "My List" } ]}}},
                    "contents": { "sectionListRenderer": { "contents": [
                        { "musicPlaylistShelfRenderer": {
                            "contents": [song_fragment("a", "A")],
                            "continuations": [
                                { "nextContinuationData": { "continuation": "tok1" }}
                            ]
                        }}
                    ]}}
                }))
            } else {
                // page 2: continuation without further token
                assert_eq!(body["continuation"], "tok1");
                ok_json(json!({ "continuationContents": { "musicPlaylistShelfContinuation": {
                    "contents": [song_fragment("b", "B")]
                }}}))
            }
        });

        let page = client(http).get_playlist("PLtest").await.unwrap();
        assert_eq!(
            page.songs.items.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(page.songs.continuation.is_none());
    }

    #[tokio::test]
    async fn mix_playlist_cap_bounds_accumulation() {
        let config = CatalogConfig::default()
            .with_mix_playlist_song_cap(3)
            .with_max_continuation_pages(50);

        let mut http = MockHttp::new();
        http.expect_execute().returning(|request| {
            let body = body_of(&request);
            let page: Vec<Value> = (0..2)
                .map(|i| song_fragment(&format!("v{}", i), "Mix Song"))
                .collect();

            if body.get("continuation").is_none() {
                ok_json(json!({
                    "header": { "musicDetailHeaderRenderer": { "title": { "runs": [
                        { "text": "Radio" } ]}}},
                    "contents": { "sectionListRenderer": { "contents": [
                        { "musicPlaylistShelfRenderer": {
                            "contents": page,
                            "continuations": [
                                { "nextContinuationData": { "continuation": "again" }}
                            ]
                        }}
                    ]}}
                }))
            } else {
                ok_json(json!({ "continuationContents": { "musicPlaylistShelfContinuation": {
                    "contents": page,
                    "continuations": [
                        { "nextContinuationData": { "continuation": "again" }}
                    ]
                }}}))
            }
        });

        let client = CatalogClient::new(Arc::new(http), config);
        let page = client.get_playlist("RDAMVMabc").await.unwrap();
        assert_eq!(page.songs.items.len(), 3);
    }

    #[tokio::test]
    async fn stream_fallback_tries_profiles_in_order() {
        let mut http = MockHttp::new();
        http.expect_execute().times(3).returning(|request| {
            let body = body_of(&request);
            let profile = body["context"]["client"]["clientName"].as_str().unwrap().to_string();
            match profile.as_str() {
                "ANDROID_MUSIC" => Err(BridgeError::Transport("timeout".into())),
                "IOS_MUSIC" => ok_json(json!({
                    "playabilityStatus": { "status": "LOGIN_REQUIRED" }
                })),
                "WEB_REMIX" => ok_json(json!({
                    "playabilityStatus": { "status": "OK" },
                    "streamingData": { "adaptiveFormats": [
                        { "mimeType": "video/mp4", "url": "https://cdn/video", "bitrate": 1000000 },
                        { "mimeType": "audio/webm; codecs=\"opus\"",
                          "url": "https://cdn/audio-low", "bitrate": 64000 },
                        { "mimeType": "audio/mp4; codecs=\"mp4a\"",
                          "url": "https://cdn/audio-high", "bitrate": 256000 }
                    ]}
                })),
                other => panic!("unexpected profile {}", other),
            }
        });

        let url = client(http)
            .resolve_stream_url("vid", StreamQuality::High)
            .await;
        assert_eq!(url.as_deref(), Some("https://cdn/audio-high"));
    }

    #[tokio::test]
    async fn stream_resolution_exhausting_profiles_yields_none() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(3)
            .returning(|_| Err(BridgeError::Transport("down".into())));

        let url = client(http)
            .resolve_stream_url("vid", StreamQuality::Medium)
            .await;
        assert!(url.is_none());
    }

    #[tokio::test]
    async fn album_lookup_is_two_phase() {
        let mut http = MockHttp::new();
        http.expect_execute().times(2).returning(|request| {
            let body = body_of(&request);
            match body["browseId"].as_str() {
                Some("MPREb_album1") => ok_json(json!({
                    "header": { "musicDetailHeaderRenderer": {
                        "title": { "runs": [{ "text": "The Album" }]},
                        "subtitle": { "runs": [
                            { "text": "Band",
                              "navigationEndpoint": { "browseEndpoint": { "browseId": "UCband" }}},
                            { "text": " • " },
                            { "text": "2019" }
                        ]}
                    }},
                    "microformat": { "microformatDataRenderer": {
                        "urlCanonical": "https://music.youtube.com/playlist?list=OLAK5uy_tracks"
                    }}
                })),
                Some("VLOLAK5uy_tracks") => ok_json(json!({
                    "contents": { "sectionListRenderer": { "contents": [
                        { "musicPlaylistShelfRenderer": { "contents": [
                            song_fragment("t1", "Track One")
                        ]}}
                    ]}}
                })),
                other => panic!("unexpected browseId {:?}", other),
            }
        });

        let page = client(http).get_album("MPREb_album1").await.unwrap();
        assert_eq!(page.album.title, "The Album");
        assert_eq!(page.album.year, Some(2019));
        assert_eq!(page.album.artists[0].id, "UCband");
        assert_eq!(page.songs.len(), 1);
        assert_eq!(page.songs[0].id, "t1");
    }

    #[tokio::test]
    async fn home_flattens_quick_picks() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            ok_json(json!({ "contents": { "sectionListRenderer": { "contents": [
                { "musicCarouselShelfRenderer": {
                    "header": { "musicCarouselShelfBasicHeaderRenderer": {
                        "title": { "runs": [{ "text": "Quick picks" }]}}},
                    "contents": [
                        { "musicTwoRowItemRenderer": {
                            "title": { "runs": [{ "text": "Pick Me" }]},
                            "navigationEndpoint": { "watchEndpoint": { "videoId": "qp1" }}
                        }}
                    ]
                }},
                { "musicCarouselShelfRenderer": {
                    "header": { "musicCarouselShelfBasicHeaderRenderer": {
                        "title": { "runs": [{ "text": "Albums for you" }]}}},
                    "contents": [
                        { "musicTwoRowItemRenderer": {
                            "title": { "runs": [{ "text": "Some Album" }]},
                            "navigationEndpoint": { "browseEndpoint": { "browseId": "MPREb_x" }}
                        }}
                    ]
                }}
            ]}}}))
        });

        let home = client(http).get_home().await;
        assert_eq!(home.sections.len(), 2);
        assert_eq!(home.quick_picks.len(), 1);
        assert_eq!(home.quick_picks[0].id, "qp1");
    }
}
