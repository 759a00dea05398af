//! Canonical domain model
//!
//! Entities are immutable once constructed; they are re-fetched and
//! replaced, never mutated in place.

use serde::{Deserialize, Serialize};

/// Sentinel for an unknown song duration.
pub const DURATION_UNKNOWN_MS: i64 = -1;

/// An artist with a catalog channel id.
///
/// The id carries the catalog's channel namespacing prefix; candidate
/// name/link pairs failing that check are navigation artifacts, not
/// artists, and are excluded during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// A playable song. Identity is the opaque catalog content id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artists: Vec<Artist>,
    /// Milliseconds; [`DURATION_UNKNOWN_MS`] when the fragment carried none
    pub duration_ms: i64,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artists: Vec<Artist>,
    pub year: Option<i32>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

/// Item of a titled shelf; shelves are heterogeneous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SectionItem {
    Song(Song),
    Album(Album),
    Playlist(Playlist),
    Artist(Artist),
}

impl SectionItem {
    pub fn as_song(&self) -> Option<&Song> {
        match self {
            SectionItem::Song(s) => Some(s),
            _ => None,
        }
    }
}

/// Server-issued pagination cursor. Opaque: it is only ever passed back
/// verbatim, never parsed or ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a listing plus the cursor for the next one.
///
/// `continuation == None` means exhausted. An empty `items` with a token
/// still present is a legitimate page per observed server behavior;
/// callers must not infer exhaustion from emptiness alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub continuation: Option<ContinuationToken>,
}

impl<T> Paged<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            continuation: None,
        }
    }
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A titled shelf of heterogeneous items with an optional link to a
/// deeper listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub items: Vec<SectionItem>,
    pub more_token: Option<ContinuationToken>,
}

/// Unfiltered search results bucketed by entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub songs: Vec<Song>,
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
    pub playlists: Vec<Playlist>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
            && self.albums.is_empty()
            && self.artists.is_empty()
            && self.playlists.is_empty()
    }
}

/// Entity-kind filter for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    Songs,
    Albums,
    Artists,
    Playlists,
}

/// The home feed: ordered sections, plus any "quick picks" shelf
/// flattened into a song list for the caller's convenience.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    pub sections: Vec<Section>,
    pub quick_picks: Vec<Song>,
    pub continuation: Option<ContinuationToken>,
}

/// An artist's browse page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistPage {
    pub artist: Artist,
    pub description: Option<String>,
    pub sections: Vec<Section>,
}

/// An album's browse page with its full track listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumPage {
    pub album: Album,
    pub songs: Vec<Song>,
}

/// A playlist's browse page; the track listing may continue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistPage {
    pub playlist: Playlist,
    pub songs: Paged<Song>,
}
