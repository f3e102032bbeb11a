use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::BridgeError;

/// Durable home of the update cursor: one file holding a decimal integer,
/// overwritten in place on every save.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted cursor. A missing, unreadable or garbled file is
    /// the first-run state and yields 0.
    pub async fn load(&self) -> u64 {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No stored cursor at {}: {}", self.path.display(), e);
                return 0;
            }
        };

        match content.trim().parse::<u64>() {
            Ok(value) => {
                info!("Loaded update cursor {} from {}", value, self.path.display());
                value
            }
            Err(_) => {
                info!(
                    "Ignoring unparsable cursor file {}, starting from 0",
                    self.path.display()
                );
                0
            }
        }
    }

    pub async fn save(&self, value: u64) -> Result<(), BridgeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BridgeError::io(parent, e))?;
            }
        }

        tokio::fs::write(&self.path, value.to_string())
            .await
            .map_err(|e| BridgeError::io(&self.path, e))?;

        debug!("Persisted update cursor {}", value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("offset"));
        assert_eq!(store.load().await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offset");
        std::fs::write(&path, "not a number").unwrap();
        assert_eq!(CursorStore::new(&path).load().await, 0);
    }

    #[tokio::test]
    async fn test_save_creates_directories_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("state/nested/offset"));

        store.save(8).await.unwrap();
        assert_eq!(store.load().await, 8);

        store.save(12).await.unwrap();
        assert_eq!(store.load().await, 12);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "12");
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offset");
        std::fs::write(&path, "  41\n").unwrap();
        assert_eq!(CursorStore::new(&path).load().await, 41);
    }
}
