//! plexgram: a Telegram bot for browsing a Plex library.
//!
//! Users list and search the catalog with slash commands; replies are
//! rendered as Telegram MarkdownV2 with thumbnails, split to fit Telegram's
//! caption and message limits. Problem reports and requests are appended to
//! a local log.
//!
//! See `DESIGN.md` for architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod plex;
pub mod reports;
pub mod telegram;
