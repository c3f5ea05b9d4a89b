//! The chat front end.
//!
//! Pulls inbound messages from a [`Channel`](sysbot_core::Channel), checks
//! them against the allow-list, answers the built-in commands, saves uploaded
//! documents and hands free text to the agent runtime. Replies that do not fit
//! in one message are delivered as a text document.

pub mod commands;
pub mod dispatcher;
pub mod reply;
pub mod uploads;

pub use commands::Command;
pub use dispatcher::{Dispatcher, FrontendOptions};
pub use reply::collect_reply;
