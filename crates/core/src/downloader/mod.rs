//! Acquisition stage client.
//!
//! This module provides a `Downloader` trait for fetching a work item's
//! content, plus a qBittorrent WebUI backend.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentDownloader;
pub use types::*;
