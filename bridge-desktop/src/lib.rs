//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with fail-fast timeouts and streaming
//!   range downloads
//! - `FileSystemAccess` using `tokio::fs`
//! - `KeyValueStore` persisted as a single JSON document on disk
//! - `logging` helpers wiring `tracing-subscriber` with an env filter
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonFileStore, NativeFileSystem, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     bridge_desktop::logging::init();
//!
//!     let http = ReqwestHttpClient::new();
//!     let fs = NativeFileSystem::new();
//!     let kv = JsonFileStore::open("tunekit/registry.json".into()).await.unwrap();
//!     // hand these to core-catalog / core-offline
//! }
//! ```

mod filesystem;
mod http;
mod kv;
pub mod logging;

pub use filesystem::NativeFileSystem;
pub use http::ReqwestHttpClient;
pub use kv::JsonFileStore;
