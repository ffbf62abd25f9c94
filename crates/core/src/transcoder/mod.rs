//! Transcode stage client.
//!
//! This module provides a `Transcoder` trait for remote encode services,
//! plus a FinalRip backend.

mod finalrip;
mod types;

pub use finalrip::FinalRipTranscoder;
pub use types::*;
