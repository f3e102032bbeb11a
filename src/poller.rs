use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cursor::CursorStore;
use crate::error::BridgeError;
use crate::media::MediaStore;
use crate::render::render_update;
use crate::telegram::{FetchWindow, TelegramApi, Update};

/// How a fetch relates to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Read from the cursor onwards and advance past what was returned.
    Consume { limit: u8, timeout: u32 },
    /// Re-read the `count` identifiers just below the cursor, leaving it alone.
    Peek { count: u8 },
}

impl FetchMode {
    pub fn window(self, cursor: u64) -> FetchWindow {
        match self {
            FetchMode::Consume { limit, timeout } => FetchWindow {
                offset: cursor,
                limit,
                timeout,
            },
            FetchMode::Peek { count } => FetchWindow {
                offset: cursor.saturating_sub(u64::from(count)),
                limit: count,
                timeout: 0,
            },
        }
    }

    fn adjective(self) -> &'static str {
        match self {
            FetchMode::Consume { .. } => "new",
            FetchMode::Peek { .. } => "previous",
        }
    }
}

/// Cursor after consuming `updates`, or `None` when nothing was returned.
pub fn next_cursor(updates: &[Update]) -> Option<u64> {
    updates
        .iter()
        .map(|u| u.update_id)
        .max()
        .map(|id| id.saturating_add(1))
}

/// Owns the update cursor and serves consume and peek fetches over it.
pub struct UpdatePoller {
    api: Arc<dyn TelegramApi>,
    store: CursorStore,
    media: MediaStore,
    /// Held across {fetch, advance, persist} for consume calls.
    cursor: Mutex<u64>,
}

impl UpdatePoller {
    /// Load the persisted cursor and build the poller around it.
    pub async fn open(api: Arc<dyn TelegramApi>, store: CursorStore, media: MediaStore) -> Self {
        let cursor = store.load().await;
        info!(
            "Update cursor starts at {} ({}), downloads go to {}",
            cursor,
            store.path().display(),
            media.dir().display()
        );
        Self {
            api,
            store,
            media,
            cursor: Mutex::new(cursor),
        }
    }

    #[cfg(test)]
    pub async fn cursor(&self) -> u64 {
        *self.cursor.lock().await
    }

    pub async fn fetch(&self, mode: FetchMode) -> Result<String, BridgeError> {
        let mut updates = match mode {
            FetchMode::Consume { .. } => self.consume(mode).await?,
            FetchMode::Peek { .. } => {
                let cursor = *self.cursor.lock().await;
                let window = mode.window(cursor);
                debug!("Peeking updates with {:?}", window);
                self.api.get_updates(window).await?
            }
        };
        updates.sort_by_key(|u| u.update_id);

        if updates.is_empty() {
            return Ok(match mode {
                FetchMode::Consume { .. } => "No new messages.".to_string(),
                FetchMode::Peek { .. } => "No previous messages.".to_string(),
            });
        }

        let mut lines = Vec::with_capacity(updates.len() + 1);
        lines.push(format!("{} {} message(s):", updates.len(), mode.adjective()));
        for update in &updates {
            lines.push(render_update(update, self.api.as_ref(), &self.media).await);
        }
        Ok(lines.join("\n"))
    }

    /// The cursor moves only after a successful, non-empty fetch, and only
    /// once the new value is on disk.
    async fn consume(&self, mode: FetchMode) -> Result<Vec<Update>, BridgeError> {
        let mut cursor = self.cursor.lock().await;
        let window = mode.window(*cursor);
        debug!("Consuming updates with {:?}", window);

        let updates = self.api.get_updates(window).await?;

        if let Some(next) = next_cursor(&updates) {
            if next > *cursor {
                self.store.save(next).await?;
                info!("Advanced update cursor {} -> {}", *cursor, next);
                *cursor = next;
            }
        }

        Ok(updates)
    }
}
