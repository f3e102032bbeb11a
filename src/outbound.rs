use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{format_size, BridgeError, MAX_UPLOAD_BYTES};
use crate::telegram::{OutboundKind, OutboundRequest, ParseMode, Payload, TelegramApi};

/// What to send; the kind decides the Bot API method and field.
#[derive(Debug, Clone)]
pub enum Outgoing<'a> {
    Text(&'a str),
    File { kind: OutboundKind, path: &'a Path },
}

/// Per-call delivery options shared by every send tool.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub chat_id: Option<String>,
    pub caption: Option<String>,
    pub parse_mode: Option<ParseMode>,
    pub silent: bool,
}

/// Sends text and files, filling in the default chat when none is given.
pub struct Outbound {
    api: Arc<dyn TelegramApi>,
    default_chat_id: Option<String>,
}

impl Outbound {
    pub fn new(api: Arc<dyn TelegramApi>, default_chat_id: Option<String>) -> Self {
        Self {
            api,
            default_chat_id,
        }
    }

    fn resolve_chat(&self, requested: Option<String>) -> Result<String, BridgeError> {
        requested
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.default_chat_id.clone())
            .ok_or(BridgeError::MissingChat)
    }

    pub async fn send(
        &self,
        outgoing: Outgoing<'_>,
        options: SendOptions,
    ) -> Result<String, BridgeError> {
        let chat_id = self.resolve_chat(options.chat_id)?;

        let (kind, payload, caption) = match outgoing {
            Outgoing::Text(text) => (OutboundKind::Text, Payload::Text(text.to_string()), None),
            Outgoing::File { kind, path } => {
                let payload = read_upload(path).await?;
                (kind, payload, options.caption)
            }
        };

        info!("Sending {} to chat {}", kind.method(), chat_id);

        let message = self
            .api
            .send(OutboundRequest {
                kind,
                chat_id,
                payload,
                caption,
                parse_mode: options.parse_mode,
                silent: options.silent,
            })
            .await?;

        Ok(format!(
            "{} sent successfully (message_id: {}, chat_id: {})",
            kind.label(),
            message.message_id,
            message.chat.id
        ))
    }
}

/// Check the file exists and is within the upload limit, then read it.
async fn read_upload(path: &Path) -> Result<Payload, BridgeError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            return Err(BridgeError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
    };

    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err(BridgeError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
        });
    }

    info!("Uploading {} ({})", path.display(), format_size(metadata.len()));

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| BridgeError::io(path, e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    Ok(Payload::File { file_name, bytes })
}
