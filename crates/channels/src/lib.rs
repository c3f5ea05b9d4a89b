//! Chat transports for SysBot.
//!
//! Each transport implements [`sysbot_core::Channel`]: the front end pulls
//! batches of inbound messages and answers with text or documents.
//!
//! Available channels:
//! - **Telegram**: Bot API over HTTPS long polling

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramConfig};
