//! Fragment normalization
//!
//! Pure conversion of server response fragments into canonical entities.
//! The service represents the same logical entity in a small closed set of
//! renderer shapes; each shape gets its own extraction path behind a
//! [`FragmentShape`] match instead of speculative deep field access.
//!
//! Absence of a required field (`videoId`/`id` or `title`) in a fragment is
//! expected, not exceptional: extraction returns `None` and the caller
//! drops the fragment. Nothing in this module performs I/O or panics on
//! malformed input.

use serde_json::Value;

use crate::types::{Album, Artist, Playlist, SectionItem, Song, DURATION_UNKNOWN_MS};

/// Channel-id namespace prefix for artists. This predicate does double
/// duty: it filters artist candidates out of subtitle runs, and it
/// distinguishes "artist" from "album"/"playlist" when routing browse
/// targets. Keep it as the single shared check.
const ARTIST_CHANNEL_PREFIX: &str = "UC";

/// Browse-id prefix wrapping a playlist id; stripped before use.
const PLAYLIST_BROWSE_PREFIX: &str = "VL";

/// The known song-bearing renderer shapes, mutually exclusive. They differ
/// in where `videoId`, `title`, and the artist runs are nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentShape {
    /// Flat list row (`musicResponsiveListItemRenderer`): search results,
    /// album/playlist track listings.
    ListItem,
    /// Tile (`musicTwoRowItemRenderer`): home feed and artist shelves.
    TwoRow,
}

/// True when `id` sits in the catalog's artist channel-id namespace.
pub fn is_artist_channel_id(id: &str) -> bool {
    id.starts_with(ARTIST_CHANNEL_PREFIX)
}

/// True when a browse target names a playlist (directly or wrapped).
pub fn is_playlist_browse_id(id: &str) -> bool {
    id.starts_with(PLAYLIST_BROWSE_PREFIX)
        || id.starts_with("PL")
        || id.starts_with("RD")
        || id.starts_with("OLAK5uy_")
}

/// Strip the browse wrapper from a playlist browse id.
pub fn playlist_id_from_browse_id(id: &str) -> &str {
    id.strip_prefix(PLAYLIST_BROWSE_PREFIX).unwrap_or(id)
}

/// True for mix-type (radio) playlist ids, which paginate without end.
pub fn is_mix_playlist_id(id: &str) -> bool {
    id.starts_with("RD")
}

// ---------------------------------------------------------------------------
// Low-level field access
// ---------------------------------------------------------------------------

fn runs(text: &Value) -> Option<&Vec<Value>> {
    text.get("runs")?.as_array()
}

fn first_run_text(text: &Value) -> Option<&str> {
    runs(text)?.first()?.get("text")?.as_str()
}

fn run_browse_id(run: &Value) -> Option<&str> {
    run.get("navigationEndpoint")?
        .get("browseEndpoint")?
        .get("browseId")?
        .as_str()
}

fn run_watch_id(run: &Value) -> Option<&str> {
    run.get("navigationEndpoint")?
        .get("watchEndpoint")?
        .get("videoId")?
        .as_str()
}

fn flex_column_text(fragment: &Value, index: usize) -> Option<&Value> {
    fragment
        .get("flexColumns")?
        .as_array()?
        .get(index)?
        .get("musicResponsiveListItemFlexColumnRenderer")?
        .get("text")
}

fn fixed_column_text(fragment: &Value, index: usize) -> Option<&str> {
    first_run_text(
        fragment
            .get("fixedColumns")?
            .as_array()?
            .get(index)?
            .get("musicResponsiveListItemFixedColumnRenderer")?
            .get("text")?,
    )
}

// ---------------------------------------------------------------------------
// Shared extraction
// ---------------------------------------------------------------------------

/// Filter candidate name/link pairs down to real artists, preserving
/// order. Runs without a link, or whose link target is outside the artist
/// channel-id namespace (albums, separators, "& more" artifacts), are
/// dropped.
pub fn artists_from_runs(text: &Value) -> Vec<Artist> {
    let Some(runs) = runs(text) else {
        return Vec::new();
    };

    runs.iter()
        .filter_map(|run| {
            let id = run_browse_id(run)?;
            if !is_artist_channel_id(id) {
                return None;
            }
            let name = run.get("text")?.as_str()?;
            Some(Artist {
                id: id.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

/// Select the highest-resolution image candidate (the list is ordered
/// small to large) and strip the trailing size-query suffix so a
/// canonical, cacheable URL results.
pub fn thumbnail_from_candidates(thumbnails: &Value) -> Option<String> {
    let url = thumbnails.as_array()?.last()?.get("url")?.as_str()?;
    let canonical = match url.find("=w") {
        Some(pos) => &url[..pos],
        None => url,
    };
    Some(canonical.to_string())
}

fn list_item_thumbnail(fragment: &Value) -> Option<String> {
    thumbnail_from_candidates(
        fragment
            .get("thumbnail")?
            .get("musicThumbnailRenderer")?
            .get("thumbnail")?
            .get("thumbnails")?,
    )
}

fn two_row_thumbnail(fragment: &Value) -> Option<String> {
    thumbnail_from_candidates(
        fragment
            .get("thumbnailRenderer")?
            .get("musicThumbnailRenderer")?
            .get("thumbnail")?
            .get("thumbnails")?,
    )
}

/// Parse a "M:SS" / "H:MM:SS" duration label into milliseconds.
/// Returns [`DURATION_UNKNOWN_MS`] for anything else.
pub fn parse_duration_ms(label: &str) -> i64 {
    let mut total: i64 = 0;
    for part in label.split(':') {
        let Ok(n) = part.trim().parse::<i64>() else {
            return DURATION_UNKNOWN_MS;
        };
        total = match total.checked_mul(60).and_then(|t| t.checked_add(n)) {
            Some(t) => t,
            None => return DURATION_UNKNOWN_MS,
        };
    }
    if label.contains(':') {
        total.checked_mul(1000).unwrap_or(DURATION_UNKNOWN_MS)
    } else {
        DURATION_UNKNOWN_MS
    }
}

// ---------------------------------------------------------------------------
// Play/browse affordances (used by search routing)
// ---------------------------------------------------------------------------

/// Content id of the fragment's play affordance, if it has one.
pub fn play_target(shape: FragmentShape, fragment: &Value) -> Option<&str> {
    match shape {
        FragmentShape::ListItem => fragment
            .get("playlistItemData")
            .and_then(|d| d.get("videoId"))
            .and_then(Value::as_str)
            .or_else(|| {
                fragment
                    .get("overlay")?
                    .get("musicItemThumbnailOverlayRenderer")?
                    .get("content")?
                    .get("musicPlayButtonRenderer")?
                    .get("playNavigationEndpoint")?
                    .get("watchEndpoint")?
                    .get("videoId")?
                    .as_str()
            }),
        FragmentShape::TwoRow => fragment
            .get("navigationEndpoint")?
            .get("watchEndpoint")?
            .get("videoId")?
            .as_str(),
    }
}

/// Direct watch target reachable from the fragment's title, if any.
pub fn watch_target(shape: FragmentShape, fragment: &Value) -> Option<&str> {
    match shape {
        FragmentShape::ListItem => {
            runs(flex_column_text(fragment, 0)?)?.iter().find_map(run_watch_id)
        }
        FragmentShape::TwoRow => play_target(shape, fragment),
    }
}

/// Browse target of the fragment, if any.
pub fn browse_target(shape: FragmentShape, fragment: &Value) -> Option<&str> {
    match shape {
        FragmentShape::ListItem => fragment
            .get("navigationEndpoint")?
            .get("browseEndpoint")?
            .get("browseId")?
            .as_str(),
        FragmentShape::TwoRow => fragment
            .get("navigationEndpoint")?
            .get("browseEndpoint")?
            .get("browseId")?
            .as_str(),
    }
}

// ---------------------------------------------------------------------------
// Entity extraction
// ---------------------------------------------------------------------------

fn title_of(shape: FragmentShape, fragment: &Value) -> Option<&str> {
    match shape {
        FragmentShape::ListItem => first_run_text(flex_column_text(fragment, 0)?),
        FragmentShape::TwoRow => first_run_text(fragment.get("title")?),
    }
}

fn subtitle_of(shape: FragmentShape, fragment: &Value) -> Option<&Value> {
    match shape {
        FragmentShape::ListItem => flex_column_text(fragment, 1),
        FragmentShape::TwoRow => fragment.get("subtitle"),
    }
}

/// Extract a [`Song`] from a song-bearing fragment.
///
/// Total: `None` when the content id or title is missing, whatever else
/// the fragment contains.
pub fn song_from_fragment(shape: FragmentShape, fragment: &Value) -> Option<Song> {
    let id = play_target(shape, fragment).or_else(|| watch_target(shape, fragment))?;
    let title = title_of(shape, fragment)?;

    let artists = subtitle_of(shape, fragment)
        .map(artists_from_runs)
        .unwrap_or_default();

    let duration_ms = match shape {
        FragmentShape::ListItem => fixed_column_text(fragment, 0)
            .map(parse_duration_ms)
            .unwrap_or(DURATION_UNKNOWN_MS),
        FragmentShape::TwoRow => DURATION_UNKNOWN_MS,
    };

    let thumbnail_url = match shape {
        FragmentShape::ListItem => list_item_thumbnail(fragment),
        FragmentShape::TwoRow => two_row_thumbnail(fragment),
    };

    Some(Song {
        id: id.to_string(),
        title: title.to_string(),
        artists,
        duration_ms,
        thumbnail_url,
    })
}

/// Extract an [`Album`] from a browse fragment.
pub fn album_from_fragment(shape: FragmentShape, fragment: &Value) -> Option<Album> {
    let id = browse_target(shape, fragment)?;
    let title = title_of(shape, fragment)?;

    let subtitle = subtitle_of(shape, fragment);
    let artists = subtitle.map(artists_from_runs).unwrap_or_default();
    let year = subtitle
        .and_then(runs)
        .and_then(|r| r.last())
        .and_then(|run| run.get("text"))
        .and_then(Value::as_str)
        .and_then(|t| t.trim().parse::<i32>().ok());

    let thumbnail_url = match shape {
        FragmentShape::ListItem => list_item_thumbnail(fragment),
        FragmentShape::TwoRow => two_row_thumbnail(fragment),
    };

    Some(Album {
        id: id.to_string(),
        title: title.to_string(),
        artists,
        year,
        thumbnail_url,
    })
}

/// Extract a [`Playlist`] from a browse fragment, unwrapping the browse
/// prefix from its id.
pub fn playlist_from_fragment(shape: FragmentShape, fragment: &Value) -> Option<Playlist> {
    let id = browse_target(shape, fragment)?;
    let title = title_of(shape, fragment)?;

    let thumbnail_url = match shape {
        FragmentShape::ListItem => list_item_thumbnail(fragment),
        FragmentShape::TwoRow => two_row_thumbnail(fragment),
    };

    Some(Playlist {
        id: playlist_id_from_browse_id(id).to_string(),
        title: title.to_string(),
        thumbnail_url,
    })
}

/// Extract an [`Artist`] from a browse fragment.
pub fn artist_from_fragment(shape: FragmentShape, fragment: &Value) -> Option<Artist> {
    let id = browse_target(shape, fragment)?;
    if !is_artist_channel_id(id) {
        return None;
    }
    let name = title_of(shape, fragment)?;

    Some(Artist {
        id: id.to_string(),
        name: name.to_string(),
    })
}

/// Route a fragment to its entity kind and extract it.
///
/// Routing inspects, in order: (1) a play affordance, meaning a song;
/// (2) the browse-target id namespace, distinguishing artist from
/// playlist from album; (3) a direct watch target, also a song.
/// Fragments matching none of these are dropped.
pub fn section_item_from_fragment(shape: FragmentShape, fragment: &Value) -> Option<SectionItem> {
    if play_target(shape, fragment).is_some() {
        return song_from_fragment(shape, fragment).map(SectionItem::Song);
    }

    if let Some(id) = browse_target(shape, fragment) {
        if is_artist_channel_id(id) {
            return artist_from_fragment(shape, fragment).map(SectionItem::Artist);
        }
        if is_playlist_browse_id(id) {
            return playlist_from_fragment(shape, fragment).map(SectionItem::Playlist);
        }
        return album_from_fragment(shape, fragment).map(SectionItem::Album);
    }

    if watch_target(shape, fragment).is_some() {
        return song_from_fragment(shape, fragment).map(SectionItem::Song);
    }

    None
}
