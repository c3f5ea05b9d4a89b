//! Password-based file encryption.
//!
//! Layout of an encrypted blob:
//!
//! ```text
//! MAGIC (8) | salt (16) | nonce (12) | AES-256-GCM ciphertext + tag
//! ```
//!
//! The key is derived with PBKDF2-HMAC-SHA256 from the password and the
//! per-file random salt, so the same password yields a different key for
//! every file.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hmac::Hmac;
use rand::Rng;
use sha2::Sha256;

const MAGIC: &[u8; 8] = b"SYSBOT01";
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

/// PBKDF2 iteration count used for new files.
pub const DEFAULT_ROUNDS: u32 = 100_000;

/// Errors from encrypting or decrypting a blob.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Not an encrypted file (missing header)")]
    NotEncrypted,

    #[error("Decryption failed: wrong password or corrupted file")]
    DecryptFailed,

    #[error("Encryption failed: {0}")]
    EncryptFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

/// AES-256-GCM cipher keyed from a password.
#[derive(Debug, Clone)]
pub struct FileCipher {
    rounds: u32,
}

impl Default for FileCipher {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl FileCipher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the PBKDF2 iteration count. Decryption must use the same count.
    pub fn with_rounds(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    /// Whether `data` starts with the encrypted-file header.
    pub fn is_encrypted(data: &[u8]) -> bool {
        data.len() >= HEADER_LEN && data.starts_with(MAGIC)
    }

    pub fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>, CipherError> {
        if password.is_empty() {
            return Err(CipherError::EmptyPassword);
        }

        let mut rng = rand::rng();
        let mut salt = [0u8; SALT_LEN];
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut salt);
        rng.fill(&mut nonce_bytes);

        let cipher = self.cipher_for(password, &salt)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CipherError::EncryptFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8], password: &str) -> Result<Vec<u8>, CipherError> {
        if password.is_empty() {
            return Err(CipherError::EmptyPassword);
        }
        if !Self::is_encrypted(data) {
            return Err(CipherError::NotEncrypted);
        }

        let salt = &data[MAGIC.len()..MAGIC.len() + SALT_LEN];
        let nonce_bytes = &data[MAGIC.len() + SALT_LEN..HEADER_LEN];
        let ciphertext = &data[HEADER_LEN..];

        let cipher = self.cipher_for(password, salt)?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::DecryptFailed)
    }

    fn cipher_for(&self, password: &str, salt: &[u8]) -> Result<Aes256Gcm, CipherError> {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, self.rounds, &mut key)
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        Aes256Gcm::new_from_slice(&key).map_err(|e| CipherError::KeyDerivation(e.to_string()))
    }
}
