use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{
    ApiResponse, Encoding, FetchWindow, Message, OutboundRequest, Payload, RemoteFile,
    TelegramApi, Update, User,
};
use crate::error::BridgeError;

/// Time allowed for ordinary API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time on top of the long-poll hold before a `getUpdates` call gives up.
const LONG_POLL_GRACE: Duration = Duration::from_secs(10);

/// reqwest errors render the request URL, which embeds the bot token.
fn transport(err: reqwest::Error) -> BridgeError {
    BridgeError::Transport(err.without_url())
}

pub struct HttpTelegramApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTelegramApi {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T, BridgeError> {
        debug!("Calling Telegram method {}", method);

        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        decode(response).await
    }

    async fn call_multipart<T: DeserializeOwned>(
        &self,
        method: &str,
        form: Form,
    ) -> Result<T, BridgeError> {
        debug!("Uploading to Telegram method {}", method);

        let response = self
            .client
            .post(self.method_url(method))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        decode(response).await
    }
}

/// Telegram answers errors with a JSON envelope too, so the body is parsed
/// whatever the HTTP status.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BridgeError> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport)?;

    let envelope: ApiResponse<T> = serde_json::from_slice(&body)
        .map_err(|e| BridgeError::Decode(format!("HTTP {}: {}", status, e)))?;

    envelope.into_result()
}

#[async_trait]
impl TelegramApi for HttpTelegramApi {
    async fn get_me(&self) -> Result<User, BridgeError> {
        self.call_json("getMe", &json!({}), REQUEST_TIMEOUT).await
    }

    async fn get_updates(&self, window: FetchWindow) -> Result<Vec<Update>, BridgeError> {
        let body = serde_json::to_value(window)
            .map_err(|e| BridgeError::Decode(format!("failed to encode fetch window: {}", e)))?;
        let timeout = Duration::from_secs(u64::from(window.timeout)) + LONG_POLL_GRACE;
        self.call_json("getUpdates", &body, timeout).await
    }

    async fn send(&self, request: OutboundRequest) -> Result<Message, BridgeError> {
        let kind = request.kind;

        match (kind.encoding(), request.payload) {
            (Encoding::Json, Payload::Text(text)) => {
                let mut body = Map::new();
                body.insert("chat_id".into(), Value::String(request.chat_id));
                body.insert(kind.field().into(), Value::String(text));
                if let Some(mode) = request.parse_mode {
                    body.insert("parse_mode".into(), Value::String(mode.as_str().into()));
                }
                if request.silent {
                    body.insert("disable_notification".into(), Value::Bool(true));
                }
                self.call_json(kind.method(), &Value::Object(body), REQUEST_TIMEOUT)
                    .await
            }
            (Encoding::Multipart, Payload::File { file_name, bytes }) => {
                let mut form = Form::new()
                    .text("chat_id", request.chat_id)
                    .part(kind.field(), Part::bytes(bytes).file_name(file_name));
                if let Some(caption) = request.caption {
                    form = form.text("caption", caption);
                }
                if let Some(mode) = request.parse_mode {
                    form = form.text("parse_mode", mode.as_str());
                }
                if request.silent {
                    form = form.text("disable_notification", "true");
                }
                self.call_multipart(kind.method(), form).await
            }
            (encoding, _) => Err(BridgeError::InvalidInput(format!(
                "{} expects a {:?} payload",
                kind.method(),
                encoding
            ))),
        }
    }

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, BridgeError> {
        self.call_json("getFile", &json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await
    }

    async fn download(&self, file_path: &str) -> Result<Vec<u8>, BridgeError> {
        debug!("Downloading Telegram file {}", file_path);

        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Api {
                description: format!("file download failed with HTTP {}", status),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}
