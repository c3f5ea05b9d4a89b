//! Saving uploaded documents into a session's working directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const FALLBACK_NAME: &str = "document";

/// Upper bound on `name (n).ext` candidates before giving up.
const MAX_SUFFIX: u32 = 10_000;

/// Reduce a client-supplied name to its final path component.
/// Empty names and `.`/`..` fall back to `document`.
pub fn sanitize_file_name(raw: Option<&str>) -> String {
    raw.and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// The `n`-th alternative for `name`: `report (2).txt`.
fn numbered(name: &str, n: u32) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{} ({n}).{}",
            stem.to_string_lossy(),
            ext.to_string_lossy()
        ),
        _ => format!("{name} ({n})"),
    }
}

/// Write `bytes` into `dir` under `name`.
///
/// With `overwrite` an existing file is replaced. Otherwise the first free
/// name among `name`, `name (1)`, `name (2)` ... is used; the file is created
/// exclusively so a concurrent writer can never be clobbered.
pub async fn save_upload(
    dir: &Path,
    name: &str,
    bytes: &[u8],
    overwrite: bool,
) -> std::io::Result<PathBuf> {
    if overwrite {
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        return Ok(path);
    }

    for n in 0..=MAX_SUFFIX {
        let candidate = if n == 0 {
            name.to_string()
        } else {
            numbered(name, n)
        };
        let path = dir.join(&candidate);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(bytes).await?;
                file.flush().await?;
                debug!(path = %path.display(), size = bytes.len(), "Saved upload");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {name}"),
    ))
}
