//! Downloading message attachments into the local downloads directory.
//!
//! Files land at `{dir}/{epoch_ms}-{name}`. The name comes from the message
//! (document file name) or the attachment kind, and borrows the extension of
//! the remote path when it has none of its own. A name already taken gets a
//! `-1`, `-2`, ... suffix before the extension.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::telegram::{Attachment, TelegramApi};

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Outcome of trying to materialize one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    Saved(PathBuf),
    Unavailable { reason: String },
}

impl Materialized {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Materialized::Saved(path) => Some(path),
            Materialized::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve, download and store a file. Never fails: problems are
    /// reported as [`Materialized::Unavailable`].
    pub async fn materialize(
        &self,
        api: &dyn TelegramApi,
        attachment: &Attachment<'_>,
    ) -> Materialized {
        let file_id = attachment.file_id;
        match self.fetch(api, attachment).await {
            Ok(path) => {
                info!("Saved attachment to {}", path.display());
                Materialized::Saved(path)
            }
            Err(e) => {
                warn!("Could not download attachment {}: {}", file_id, e);
                Materialized::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch(
        &self,
        api: &dyn TelegramApi,
        attachment: &Attachment<'_>,
    ) -> Result<PathBuf, BridgeError> {
        let remote = api.get_file(attachment.file_id).await?;
        let remote_path = remote.file_path.ok_or_else(|| {
            BridgeError::Decode(format!(
                "getFile returned no file_path for {}",
                attachment.file_id
            ))
        })?;

        let file_name = local_file_name(
            attachment.display_name(),
            attachment.kind.default_name(),
            &remote_path,
            Utc::now().timestamp_millis(),
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BridgeError::io(&self.dir, e))?;

        let bytes = api.download(&remote_path).await?;
        self.write_new(&file_name, &bytes).await
    }

    /// Write `bytes` under the first free variant of `file_name`; existing
    /// downloads are never overwritten.
    async fn write_new(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, BridgeError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let dest = self.dir.join(numbered_name(file_name, attempt));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&dest).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BridgeError::io(&dest, e)),
            };
            file.write_all(bytes)
                .await
                .map_err(|e| BridgeError::io(&dest, e))?;
            file.flush().await.map_err(|e| BridgeError::io(&dest, e))?;
            return Ok(dest);
        }

        Err(BridgeError::io(
            self.dir.join(file_name),
            std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
        ))
    }
}

/// `name` for attempt 0, then `stem-N.ext` for later attempts.
fn numbered_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, attempt, ext),
        None => format!("{}-{}", stem, attempt),
    }
}

/// Build `{epoch_ms}-{name}[.ext]` for a downloaded file, using `fallback`
/// when nothing usable is left of `display_name`.
pub fn local_file_name(
    display_name: &str,
    fallback: &str,
    remote_path: &str,
    epoch_ms: i64,
) -> String {
    let mut name = sanitize_filename(display_name, fallback);

    if Path::new(&name).extension().is_none() {
        if let Some(ext) = Path::new(remote_path).extension().and_then(|e| e.to_str()) {
            name.push('.');
            name.push_str(ext);
        }
    }

    format!("{}-{}", epoch_ms, name)
}

/// Keep a file name inside the downloads directory: path separators become
/// underscores and leading dots are dropped. An empty result becomes `fallback`.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let sanitized = name
        .replace(['/', '\\'], "_")
        .trim_start_matches('.')
        .to_string();

    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized
    }
}
