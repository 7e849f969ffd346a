//! giveaway-daemon - Telegram giveaway bot.
//!
//! This library holds the chat-facing half of the bot: command parsing, the
//! contest creation dialogue, message rendering and the Bot API transport.
//! Contest state and the lifecycle engine live in `giveaway_core`.
//!
//! # Modules
//!
//! - [`commands`]: slash commands and inline-button payloads
//! - [`dialogue`]: per-(chat, user) contest creation state machine
//! - [`handlers`]: update dispatch against a [`handlers::ChatSurface`]
//! - [`render`]: user-facing texts and keyboards
//! - [`state`]: shared daemon state
//! - [`telegram`]: Bot API client and long-polling loop

#![warn(missing_docs)]

pub mod commands;
pub mod dialogue;
pub mod handlers;
pub mod render;
pub mod state;
pub mod telegram;
