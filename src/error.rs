use std::path::PathBuf;

use thiserror::Error;

/// Largest file a bot may upload through the Bot API.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Errors reported back to the MCP client as error tool results.
///
/// None of these are fatal: the server keeps serving after any of them.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No chat_id given and no default chat configured (set TELEGRAM_CHAT_ID)")]
    MissingChat,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(
        "File too large: {} is {}, Telegram bots can upload at most 50 MB",
        path.display(),
        format_size(*size)
    )]
    FileTooLarge { path: PathBuf, size: u64 },

    #[error("Telegram API error: {description}")]
    Api { description: String },

    #[error("Request to Telegram failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from Telegram: {0}")]
    Decode(String),

    #[error("I/O error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Human-readable size in megabytes, one decimal place.
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}
