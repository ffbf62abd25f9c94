//! Publish stage client.
//!
//! This module provides a `Publisher` trait for posting finished files,
//! plus a Telegram Bot API backend.

mod telegram;
mod types;

pub use telegram::TelegramPublisher;
pub use types::*;
