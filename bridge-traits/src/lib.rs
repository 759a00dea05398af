//! # Host Bridge Traits
//!
//! Capability traits that must be implemented by the host wiring up the
//! catalog and offline cores.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and the
//! environment they run in. The cores depend on exactly three capabilities
//! and nothing else:
//!
//! - [`HttpClient`](http::HttpClient) - async HTTP with streaming,
//!   byte-range downloads, and fail-fast timeouts
//! - [`FileSystemAccess`](storage::FileSystemAccess) - local file I/O for
//!   cached media and downloads
//! - [`KeyValueStore`](storage::KeyValueStore) - durable string-to-string
//!   storage for cache registries
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host
//! implementations should convert platform-specific errors into it and
//! include context (file paths, URLs, status codes) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc<dyn Trait>`.

pub mod error;
pub mod http;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{FileMetadata, FileSystemAccess, KeyValueStore};
