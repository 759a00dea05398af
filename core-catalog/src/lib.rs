//! # Catalog Core
//!
//! Client for a reverse-engineered remote music-catalog service.
//!
//! ## Overview
//!
//! The remote service exposes an undocumented JSON API whose schema is
//! observed, not controlled: the same logical entity (a song, an album)
//! arrives in several different fragment shapes depending on context, and
//! those shapes change without notice. This crate normalizes that into a
//! stable domain model:
//!
//! - [`normalize`] - pure conversion of known fragment shapes into
//!   canonical entities; malformed fragments become `None`, never panics
//! - [`CatalogClient`](client::CatalogClient) - search, suggestions, home
//!   feed, artist/album/playlist browsing, and stream-URL resolution with
//!   an ordered fallback across client identity profiles
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │           CatalogClient               │
//! │  - search() / search_suggestions()    │
//! │  - get_home() / browse operations     │
//! │  - resolve_stream_url()               │
//! └───────┬───────────────────────────────┘
//!         │
//!         ├──> HttpClient (bridge-traits)
//!         ├──> context (identity profiles)
//!         └──> normalize (pure extraction)
//! ```
//!
//! ## Failure semantics
//!
//! Upstream instability is the normal operating condition. Every public
//! operation recovers transport and parse failures into empty or `None`
//! results; callers never see raw transport errors and never need to
//! distinguish "no results" from "server hiccup".

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::CatalogClient;
pub use config::CatalogConfig;
pub use context::{ClientProfile, StreamQuality};
pub use error::CatalogError;
pub use types::{
    Album, AlbumPage, Artist, ArtistPage, ContinuationToken, HomeFeed, Paged, Playlist,
    PlaylistPage, SearchFilter, SearchResults, Section, SectionItem, Song,
};
