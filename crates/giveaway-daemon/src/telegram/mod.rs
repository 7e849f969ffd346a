//! Telegram Bot API transport.

mod client;
mod polling;
pub mod types;

pub use client::{TelegramClient, TelegramError};
pub use polling::{UpdateSource, run_polling};
