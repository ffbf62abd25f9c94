//! Discovery feed.
//!
//! This module provides a `DiscoveryFeed` trait yielding candidate work items
//! for the configured series, plus a Jackett backend.

mod jackett;
mod types;

pub use jackett::JackettFeed;
pub use types::*;
