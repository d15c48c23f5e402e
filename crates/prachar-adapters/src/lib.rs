//! Prachar Adapters - Infrastructure implementations
//!
//! This crate contains concrete implementations of the ports defined in
//! prachar-core. Today that is the Telegram Bot API messaging surface.

pub mod telegram;

// Re-export primary adapter types
pub use telegram::{TelegramAdapter, DEFAULT_API_BASE};
