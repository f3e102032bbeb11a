//! MCP tool surface.
//!
//! Every tool answers with a `CallToolResult`; failures become error results
//! carrying the error text, so nothing a caller sends can fault the session.

use std::path::Path;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, ErrorData as McpError, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::outbound::{Outbound, Outgoing, SendOptions};
use crate::poller::{FetchMode, UpdatePoller};
use crate::telegram::{OutboundKind, ParseMode};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;
const MAX_TIMEOUT_SECS: u32 = 30;

/// Accept chat ids given either as a string or as a bare integer.
fn chat_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<ChatId>::deserialize(deserializer)?.map(|id| match id {
        ChatId::Text(text) => text,
        ChatId::Number(n) => n.to_string(),
    }))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMessageInput {
    /// Message text.
    pub text: String,
    /// Target chat id or @channelusername. Defaults to the configured chat.
    #[serde(default, deserialize_with = "chat_id")]
    #[schemars(with = "Option<String>")]
    pub chat_id: Option<String>,
    /// Formatting mode for the text.
    #[serde(default)]
    pub parse_mode: Option<ParseMode>,
    /// Send silently, without a notification sound.
    #[serde(default)]
    pub disable_notification: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendFileInput {
    /// Path of a local file to upload (at most 50 MB).
    pub file_path: String,
    /// Target chat id or @channelusername. Defaults to the configured chat.
    #[serde(default, deserialize_with = "chat_id")]
    #[schemars(with = "Option<String>")]
    pub chat_id: Option<String>,
    /// Caption shown under the file.
    #[serde(default)]
    pub caption: Option<String>,
    /// Formatting mode for the caption.
    #[serde(default)]
    pub parse_mode: Option<ParseMode>,
    /// Send silently, without a notification sound.
    #[serde(default)]
    pub disable_notification: Option<bool>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetUpdatesInput {
    /// Maximum number of new messages to return (1-100, default 10).
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<u32>,
    /// Seconds to wait for new messages to arrive (0-30, default 0).
    #[serde(default)]
    #[schemars(range(min = 0, max = 30))]
    pub timeout: Option<u32>,
    /// Re-read this many already delivered messages instead of fetching new
    /// ones (1-100). Does not mark anything as read.
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub peek: Option<u32>,
}

fn bounded(name: &str, value: u32, min: u32, max: u32) -> Result<u32, BridgeError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(BridgeError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )))
    }
}

impl GetUpdatesInput {
    fn mode(&self) -> Result<FetchMode, BridgeError> {
        // Bounds are all <= 100, so the narrowing casts below cannot truncate.
        if let Some(count) = self.peek {
            return Ok(FetchMode::Peek {
                count: bounded("peek", count, 1, MAX_LIMIT)? as u8,
            });
        }

        Ok(FetchMode::Consume {
            limit: bounded("limit", self.limit.unwrap_or(DEFAULT_LIMIT), 1, MAX_LIMIT)? as u8,
            timeout: bounded("timeout", self.timeout.unwrap_or(0), 0, MAX_TIMEOUT_SECS)?,
        })
    }
}

fn into_tool_result(tool: &str, result: Result<String, BridgeError>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            warn!("Tool '{}' failed: {}", tool, e);
            CallToolResult::error(vec![Content::text(format!("Error: {}", e))])
        }
    }
}

/// MCP server exposing the bot's send and receive operations.
#[derive(Clone)]
pub struct TelegramBridge {
    outbound: Arc<Outbound>,
    poller: Arc<UpdatePoller>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TelegramBridge {
    pub fn new(outbound: Outbound, poller: UpdatePoller) -> Self {
        Self {
            outbound: Arc::new(outbound),
            poller: Arc::new(poller),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Send a text message through the Telegram bot")]
    async fn send_message(
        &self,
        Parameters(input): Parameters<SendMessageInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Tool send_message invoked");
        let options = SendOptions {
            chat_id: input.chat_id,
            caption: None,
            parse_mode: input.parse_mode,
            silent: input.disable_notification.unwrap_or(false),
        };
        let result = self
            .outbound
            .send(Outgoing::Text(&input.text), options)
            .await;
        Ok(into_tool_result("send_message", result))
    }

    #[tool(description = "Upload a local file to a Telegram chat as a document")]
    async fn send_document(
        &self,
        Parameters(input): Parameters<SendFileInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.send_file(OutboundKind::Document, input).await)
    }

    #[tool(description = "Upload a local image to a Telegram chat as a photo")]
    async fn send_photo(
        &self,
        Parameters(input): Parameters<SendFileInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.send_file(OutboundKind::Photo, input).await)
    }

    #[tool(description = "Upload a local video file to a Telegram chat")]
    async fn send_video(
        &self,
        Parameters(input): Parameters<SendFileInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.send_file(OutboundKind::Video, input).await)
    }

    #[tool(description = "Upload a local audio file to a Telegram chat")]
    async fn send_audio(
        &self,
        Parameters(input): Parameters<SendFileInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.send_file(OutboundKind::Audio, input).await)
    }

    #[tool(
        description = "Fetch messages sent to the bot. By default returns new messages and marks them as read; \
                       pass `peek` to re-read recent messages without marking anything. \
                       Attachments are downloaded and their local paths included."
    )]
    async fn get_updates(
        &self,
        Parameters(input): Parameters<GetUpdatesInput>,
    ) -> Result<CallToolResult, McpError> {
        info!("Tool get_updates invoked: {:?}", input);
        let result = match input.mode() {
            Ok(mode) => self.poller.fetch(mode).await,
            Err(e) => Err(e),
        };
        Ok(into_tool_result("get_updates", result))
    }
}

impl TelegramBridge {
    async fn send_file(&self, kind: OutboundKind, input: SendFileInput) -> CallToolResult {
        let tool = format!("send_{}", kind.field());
        info!("Tool {} invoked for {}", tool, input.file_path);

        let options = SendOptions {
            chat_id: input.chat_id,
            caption: input.caption,
            parse_mode: input.parse_mode,
            silent: input.disable_notification.unwrap_or(false),
        };
        let outgoing = Outgoing::File {
            kind,
            path: Path::new(&input.file_path),
        };
        into_tool_result(&tool, self.outbound.send(outgoing, options).await)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for TelegramBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Telegram bot bridge. Use send_* tools to post messages and files, \
                 and get_updates to read messages sent to the bot."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
