//! Security module for SysBot — chat allow-lists and file encryption.
//!
//! Provides:
//! - **Allowlist**: which chats may talk to the bot
//! - **Cipher**: AES-256-GCM file encryption with PBKDF2 key derivation

pub mod allowlist;
pub mod cipher;

pub use allowlist::{ChatAllowlist, SenderCheckResult};
pub use cipher::{CipherError, FileCipher};
