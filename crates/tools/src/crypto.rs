//! Encryption tools — password-protect files in place.
//!
//! `encrypt_files` turns `name` into `name.enc` and removes the plaintext;
//! `decrypt_files` reverses it. Both accept an explicit list of paths or
//! process every regular file directly inside a directory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysbot_core::context::ToolContext;
use sysbot_core::error::ToolError;
use sysbot_core::tool::{Tool, ToolOutcome, ToolStatus, parse_args};
use sysbot_security::FileCipher;
use tracing::info;

use crate::batch::BatchFailure;
use crate::fs_util::{self, display};

const ENC_EXT: &str = "enc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypted",
            Self::Decrypt => "decrypted",
        }
    }

    /// Whether a file name is an input for this direction.
    fn accepts(self, path: &Path) -> bool {
        let is_enc = path.extension().is_some_and(|e| e == ENC_EXT);
        match self {
            Self::Encrypt => !is_enc,
            Self::Decrypt => is_enc,
        }
    }

    fn output_path(self, input: &Path) -> PathBuf {
        match self {
            Self::Encrypt => {
                let mut name = input.as_os_str().to_owned();
                name.push(".");
                name.push(ENC_EXT);
                PathBuf::from(name)
            }
            Self::Decrypt => input.with_extension(""),
        }
    }
}

#[derive(Deserialize)]
struct CryptoArgs {
    #[serde(default)]
    paths: Option<Vec<String>>,
    #[serde(default)]
    directory: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// A file transformed by a batch.
#[derive(Debug, Clone, Serialize)]
struct Processed {
    source: String,
    output: String,
}

fn schema(action: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "paths": {
                "type": "array",
                "items": { "type": "string" },
                "description": format!("Files to {action}")
            },
            "directory": {
                "type": "string",
                "description": format!("{action} every file directly inside this directory when no paths are given (defaults to the current directory)")
            },
            "password": {
                "type": "string",
                "description": "Password (defaults to the configured passphrase)"
            }
        }
    })
}

struct CryptoBatch<'a> {
    tool: &'a str,
    direction: Direction,
    cipher: &'a FileCipher,
    passphrase: Option<&'a str>,
}

impl CryptoBatch<'_> {
    async fn run(&self, args: CryptoArgs, ctx: &ToolContext) -> Result<ToolOutcome, ToolError> {
        let password = args
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.passphrase)
            .ok_or_else(|| {
                ToolError::InvalidArguments(
                    "No password given and no encryption passphrase configured".into(),
                )
            })?
            .to_string();

        let targets = self.targets(&args, ctx).await?;
        if targets.is_empty() {
            return Err(fs_util::failed(
                self.tool,
                format!("No files to be {}", self.direction.verb()),
            ));
        }

        let mut done = Vec::new();
        let mut failed = Vec::new();
        for path in &targets {
            match self.process(path, &password).await {
                Ok(output) => done.push(Processed {
                    source: display(path),
                    output: display(&output),
                }),
                Err(e) => failed.push(BatchFailure {
                    path: display(path),
                    error: e.to_string(),
                }),
            }
        }

        let verb = self.direction.verb();
        info!(tool = %self.tool, done = done.len(), failed = failed.len(), "Crypto batch finished");
        let status = ToolStatus::for_batch(failed.len(), targets.len());
        Ok(ToolOutcome::new(status)
            .with(&format!("{verb}_count"), done.len())
            .with("failed_count", failed.len())
            .with(verb, done)
            .with("failed", failed))
    }

    async fn targets(&self, args: &CryptoArgs, ctx: &ToolContext) -> Result<Vec<PathBuf>, ToolError> {
        if let Some(paths) = args.paths.as_ref().filter(|p| !p.is_empty()) {
            let mut resolved = Vec::with_capacity(paths.len());
            for raw in paths {
                resolved.push(ctx.resolve(raw).await);
            }
            return Ok(resolved);
        }

        let dir = ctx
            .resolve(args.directory.as_deref().unwrap_or_default())
            .await;
        fs_util::require_dir(self.tool, &dir).await?;
        Ok(fs_util::walk(&dir, false)
            .filter(|e| e.file_type().is_file() && self.direction.accepts(e.path()))
            .map(|e| e.into_path())
            .collect())
    }

    async fn process(&self, path: &Path, password: &str) -> Result<PathBuf, ToolError> {
        if !self.direction.accepts(path) {
            let reason = match self.direction {
                Direction::Encrypt => "File is already encrypted (.enc)",
                Direction::Decrypt => "Not an encrypted file (expected .enc)",
            };
            return Err(fs_util::failed(self.tool, reason));
        }
        fs_util::require_file(self.tool, path).await?;

        let output = self.direction.output_path(path);
        if tokio::fs::symlink_metadata(&output).await.is_ok() {
            return Err(fs_util::failed(
                self.tool,
                format!("Output already exists: {}", display(&output)),
            ));
        }

        let input = tokio::fs::read(path)
            .await
            .map_err(|e| fs_util::io_error(self.tool, path, e))?;

        let cipher = self.cipher.clone();
        let direction = self.direction;
        let password = password.to_string();
        let transformed = tokio::task::spawn_blocking(move || match direction {
            Direction::Encrypt => cipher.encrypt(&input, &password),
            Direction::Decrypt => cipher.decrypt(&input, &password),
        })
        .await
        .map_err(|e| fs_util::failed(self.tool, e.to_string()))?
        .map_err(|e| fs_util::failed(self.tool, e.to_string()))?;

        tokio::fs::write(&output, transformed)
            .await
            .map_err(|e| fs_util::io_error(self.tool, &output, e))?;
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| fs_util::io_error(self.tool, path, e))?;
        Ok(output)
    }
}

/// Encrypt files with AES-256-GCM.
pub struct EncryptFilesTool {
    passphrase: Option<String>,
    cipher: FileCipher,
}

impl EncryptFilesTool {
    pub fn new(passphrase: Option<String>) -> Self {
        Self {
            passphrase,
            cipher: FileCipher::new(),
        }
    }
}

#[async_trait]
impl Tool for EncryptFilesTool {
    fn name(&self) -> &str {
        "encrypt_files"
    }

    fn description(&self) -> &str {
        "Encrypt files with a password (AES-256-GCM). Each file is replaced by '<name>.enc'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema("encrypt")
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: CryptoArgs = parse_args(arguments)?;
        CryptoBatch {
            tool: self.name(),
            direction: Direction::Encrypt,
            cipher: &self.cipher,
            passphrase: self.passphrase.as_deref(),
        }
        .run(args, ctx)
        .await
    }
}

/// Decrypt `.enc` files produced by `encrypt_files`.
pub struct DecryptFilesTool {
    passphrase: Option<String>,
    cipher: FileCipher,
}

impl DecryptFilesTool {
    pub fn new(passphrase: Option<String>) -> Self {
        Self {
            passphrase,
            cipher: FileCipher::new(),
        }
    }
}

#[async_trait]
impl Tool for DecryptFilesTool {
    fn name(&self) -> &str {
        "decrypt_files"
    }

    fn description(&self) -> &str {
        "Decrypt '.enc' files created by encrypt_files, restoring the original names."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema("decrypt")
    }

    async fn call(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutcome, ToolError> {
        let args: CryptoArgs = parse_args(arguments)?;
        CryptoBatch {
            tool: self.name(),
            direction: Direction::Decrypt,
            cipher: &self.cipher,
            passphrase: self.passphrase.as_deref(),
        }
        .run(args, ctx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tools(passphrase: Option<&str>) -> (EncryptFilesTool, DecryptFilesTool) {
        let cipher = FileCipher::with_rounds(1_000);
        (
            EncryptFilesTool {
                passphrase: passphrase.map(String::from),
                cipher: cipher.clone(),
            },
            DecryptFilesTool {
                passphrase: passphrase.map(String::from),
                cipher,
            },
        )
    }

    #[test]
    fn output_names() {
        assert_eq!(
            Direction::Encrypt.output_path(Path::new("/a/b.txt")),
            PathBuf::from("/a/b.txt.enc")
        );
        assert_eq!(
            Direction::Decrypt.output_path(Path::new("/a/b.txt.enc")),
            PathBuf::from("/a/b.txt")
        );
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        let ctx = ToolContext::new(dir.path());
        let (enc, dec) = tools(None);

        let out = enc
            .execute(json!({"paths": ["secret.txt"], "password": "pw"}), &ctx)
            .await;
        assert!(out.is_success(), "{out}");
        assert_eq!(out.get("encrypted_count").unwrap(), &json!(1));
        assert!(!dir.path().join("secret.txt").exists());
        let blob = std::fs::read(dir.path().join("secret.txt.enc")).unwrap();
        assert!(FileCipher::is_encrypted(&blob));

        let out = dec
            .execute(json!({"paths": ["secret.txt.enc"], "password": "pw"}), &ctx)
            .await;
        assert!(out.is_success(), "{out}");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("secret.txt")).unwrap(),
            "top secret"
        );
        assert!(!dir.path().join("secret.txt.enc").exists());
    }

    #[tokio::test]
    async fn directory_mode_uses_configured_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("old.enc"), "x").unwrap();
        let ctx = ToolContext::new(dir.path());
        let (enc, _) = tools(Some("configured"));

        let out = enc.execute(json!({}), &ctx).await;
        assert!(out.is_success(), "{out}");
        assert_eq!(out.get("encrypted_count").unwrap(), &json!(2));
        assert!(dir.path().join("a.txt.enc").exists());
        assert!(dir.path().join("b.txt.enc").exists());
        assert_eq!(std::fs::read_to_string(dir.path().join("old.enc")).unwrap(), "x");
    }

    #[tokio::test]
    async fn wrong_password_keeps_ciphertext() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "data").unwrap();
        let ctx = ToolContext::new(dir.path());
        let (enc, dec) = tools(None);

        enc.execute(json!({"paths": ["f.txt"], "password": "right"}), &ctx)
            .await;
        let out = dec
            .execute(json!({"paths": ["f.txt.enc"], "password": "wrong"}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Error);
        assert!(dir.path().join("f.txt.enc").exists());
        assert!(!dir.path().join("f.txt").exists());
    }

    #[tokio::test]
    async fn mixed_batch_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "data").unwrap();
        let ctx = ToolContext::new(dir.path());
        let (enc, _) = tools(None);

        let out = enc
            .execute(json!({"paths": ["f.txt", "missing.txt"], "password": "pw"}), &ctx)
            .await;
        assert_eq!(out.status, ToolStatus::Partial);
        assert_eq!(out.get("failed_count").unwrap(), &json!(1));
    }

    #[tokio::test]
    async fn missing_password_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "data").unwrap();
        let ctx = ToolContext::new(dir.path());
        let (enc, _) = tools(None);

        let out = enc.execute(json!({"paths": ["f.txt"]}), &ctx).await;
        assert_eq!(out.status, ToolStatus::Error);
        assert!(dir.path().join("f.txt").exists());
    }
}
