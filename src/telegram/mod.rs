pub mod client;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub use client::HttpTelegramApi;

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub description: Option<String>,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, BridgeError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(BridgeError::Decode(
                "response marked ok but carried no result".to_string(),
            )),
            (false, _) => Err(BridgeError::Api {
                description: self
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }
}

/// Request descriptor for `getUpdates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    /// Inclusive lower bound on update ids.
    pub offset: u64,
    pub limit: u8,
    /// Seconds Telegram may hold the request open waiting for updates.
    pub timeout: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: u64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub channel_post: Option<Message>,
}

impl Update {
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref().or(self.channel_post.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub duration: u32,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    pub file_id: String,
    pub duration: u32,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub file_id: String,
    pub duration: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    /// Unix seconds.
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub audio: Option<Audio>,
    #[serde(default)]
    pub voice: Option<Voice>,
    #[serde(default)]
    pub sticker: Option<Sticker>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Document,
    Video,
    Audio,
    Voice,
    Sticker,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Photo => "Photo",
            MediaKind::Document => "Document",
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
            MediaKind::Voice => "Voice",
            MediaKind::Sticker => "Sticker",
        }
    }

    /// Local file name used when the message carries none.
    pub fn default_name(self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Document => "document",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice",
            MediaKind::Sticker => "sticker",
        }
    }
}

/// A downloadable attachment referenced by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment<'a> {
    pub kind: MediaKind,
    pub file_id: &'a str,
    pub file_name: Option<&'a str>,
    pub duration: Option<u32>,
    pub emoji: Option<&'a str>,
}

impl Attachment<'_> {
    pub fn display_name(&self) -> &str {
        self.file_name.unwrap_or(self.kind.default_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content<'a> {
    Text(&'a str),
    Media {
        attachment: Attachment<'a>,
        caption: Option<&'a str>,
    },
    Unsupported,
}

impl Message {
    /// Classify the message payload. Text wins over media, and the largest
    /// photo size is picked when several are present.
    pub fn content(&self) -> Content<'_> {
        if let Some(text) = self.text.as_deref() {
            return Content::Text(text);
        }

        let attachment = if let Some(largest) = self.photo.as_ref().and_then(|p| p.last()) {
            Attachment {
                kind: MediaKind::Photo,
                file_id: &largest.file_id,
                file_name: None,
                duration: None,
                emoji: None,
            }
        } else if let Some(doc) = &self.document {
            Attachment {
                kind: MediaKind::Document,
                file_id: &doc.file_id,
                file_name: doc.file_name.as_deref(),
                duration: None,
                emoji: None,
            }
        } else if let Some(video) = &self.video {
            Attachment {
                kind: MediaKind::Video,
                file_id: &video.file_id,
                file_name: video.file_name.as_deref(),
                duration: Some(video.duration),
                emoji: None,
            }
        } else if let Some(audio) = &self.audio {
            Attachment {
                kind: MediaKind::Audio,
                file_id: &audio.file_id,
                file_name: audio.file_name.as_deref(),
                duration: Some(audio.duration),
                emoji: None,
            }
        } else if let Some(voice) = &self.voice {
            Attachment {
                kind: MediaKind::Voice,
                file_id: &voice.file_id,
                file_name: None,
                duration: Some(voice.duration),
                emoji: None,
            }
        } else if let Some(sticker) = &self.sticker {
            Attachment {
                kind: MediaKind::Sticker,
                file_id: &sticker.file_id,
                file_name: None,
                duration: None,
                emoji: sticker.emoji.as_deref(),
            }
        } else {
            return Content::Unsupported;
        };

        Content::Media {
            attachment,
            caption: self.caption.as_deref(),
        }
    }
}

/// Result of `getFile`: the path to pass to the file download endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    /// Absent when the file is too big to be downloaded by bots.
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Formatting applied by Telegram to outgoing text and captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

impl ParseMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
            ParseMode::MarkdownV2 => "MarkdownV2",
            ParseMode::Html => "HTML",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Multipart,
}

/// Every outbound message kind the bridge can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundKind {
    Text,
    Document,
    Photo,
    Video,
    Audio,
}

impl OutboundKind {
    pub fn method(self) -> &'static str {
        match self {
            OutboundKind::Text => "sendMessage",
            OutboundKind::Document => "sendDocument",
            OutboundKind::Photo => "sendPhoto",
            OutboundKind::Video => "sendVideo",
            OutboundKind::Audio => "sendAudio",
        }
    }

    /// Request field carrying the text or the uploaded file.
    pub fn field(self) -> &'static str {
        match self {
            OutboundKind::Text => "text",
            OutboundKind::Document => "document",
            OutboundKind::Photo => "photo",
            OutboundKind::Video => "video",
            OutboundKind::Audio => "audio",
        }
    }

    pub fn encoding(self) -> Encoding {
        match self {
            OutboundKind::Text => Encoding::Json,
            _ => Encoding::Multipart,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutboundKind::Text => "Message",
            OutboundKind::Document => "Document",
            OutboundKind::Photo => "Photo",
            OutboundKind::Video => "Video",
            OutboundKind::Audio => "Audio",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    File { file_name: String, bytes: Vec<u8> },
}

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub kind: OutboundKind,
    pub chat_id: String,
    pub payload: Payload,
    pub caption: Option<String>,
    pub parse_mode: Option<ParseMode>,
    /// Deliver without a notification sound.
    pub silent: bool,
}

/// The slice of the Bot API the bridge talks to.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    async fn get_me(&self) -> Result<User, BridgeError>;

    async fn get_updates(&self, window: FetchWindow) -> Result<Vec<Update>, BridgeError>;

    async fn send(&self, request: OutboundRequest) -> Result<Message, BridgeError>;

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, BridgeError>;

    /// Fetch raw bytes for a `file_path` returned by [`TelegramApi::get_file`].
    async fn download(&self, file_path: &str) -> Result<Vec<u8>, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_envelope_keeps_description() {
        let resp: ApiResponse<Vec<Update>> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        }))
        .unwrap();
        match resp.into_result() {
            Err(BridgeError::Api { description }) => assert_eq!(description, "Unauthorized"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ok_envelope_yields_result() {
        let resp: ApiResponse<Vec<Update>> = serde_json::from_value(json!({
            "ok": true,
            "result": [{"update_id": 5}]
        }))
        .unwrap();
        let updates = resp.into_result().unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].message().is_none());
    }

    #[test]
    fn test_photo_picks_largest_size() {
        let msg: Message = serde_json::from_value(json!({
            "message_id": 1,
            "chat": {"id": 42, "type": "private"},
            "date": 0,
            "caption": "look",
            "photo": [
                {"file_id": "small", "width": 90, "height": 90},
                {"file_id": "large", "width": 1280, "height": 1280}
            ]
        }))
        .unwrap();
        match msg.content() {
            Content::Media {
                attachment,
                caption,
            } => {
                assert_eq!(attachment.kind, MediaKind::Photo);
                assert_eq!(attachment.file_id, "large");
                assert_eq!(attachment.display_name(), "photo");
                assert_eq!(caption, Some("look"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_document_keeps_file_name() {
        let msg: Message = serde_json::from_value(json!({
            "message_id": 2,
            "chat": {"id": 42},
            "date": 0,
            "document": {"file_id": "doc1", "file_name": "report.pdf"}
        }))
        .unwrap();
        match msg.content() {
            Content::Media { attachment, .. } => {
                assert_eq!(attachment.display_name(), "report.pdf");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_payload_is_unsupported() {
        let msg: Message = serde_json::from_value(json!({
            "message_id": 3,
            "chat": {"id": 42},
            "date": 0,
            "location": {"latitude": 1.0, "longitude": 2.0}
        }))
        .unwrap();
        assert_eq!(msg.content(), Content::Unsupported);
    }

    #[test]
    fn test_outbound_table() {
        assert_eq!(OutboundKind::Text.encoding(), Encoding::Json);
        assert_eq!(OutboundKind::Photo.method(), "sendPhoto");
        assert_eq!(OutboundKind::Audio.field(), "audio");
        assert_eq!(OutboundKind::Document.encoding(), Encoding::Multipart);
        assert_eq!(
            serde_json::to_value(ParseMode::Html).unwrap(),
            json!("HTML")
        );
    }
}
