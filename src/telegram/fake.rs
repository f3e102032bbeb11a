//! Scripted in-memory `TelegramApi` for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::{FetchWindow, Message, OutboundRequest, RemoteFile, TelegramApi, Update, User};
use crate::error::BridgeError;

#[derive(Default)]
pub struct FakeTelegram {
    batches: Mutex<VecDeque<Result<Vec<Update>, BridgeError>>>,
    windows: Mutex<Vec<FetchWindow>>,
    sent: Mutex<Vec<OutboundRequest>>,
    send_error: Mutex<Option<String>>,
    files: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl FakeTelegram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next `getUpdates` call.
    pub fn push_updates(&self, updates: Vec<Update>) {
        self.batches.lock().unwrap().push_back(Ok(updates));
    }

    /// Queue an `ok: false` answer carrying `description`.
    pub fn push_error(&self, description: &str) {
        self.push_failure(BridgeError::Api {
            description: description.to_string(),
        });
    }

    /// Queue any failure, e.g. an undecodable response.
    pub fn push_failure(&self, error: BridgeError) {
        self.batches.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_sends_with(&self, description: &str) {
        *self.send_error.lock().unwrap() = Some(description.to_string());
    }

    pub fn add_file(&self, file_id: &str, file_path: &str, bytes: &[u8]) {
        self.files.lock().unwrap().insert(
            file_id.to_string(),
            (file_path.to_string(), bytes.to_vec()),
        );
    }

    pub fn windows(&self) -> Vec<FetchWindow> {
        self.windows.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<OutboundRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelegramApi for FakeTelegram {
    async fn get_me(&self) -> Result<User, BridgeError> {
        Ok(serde_json::from_value(json!({
            "id": 1,
            "is_bot": true,
            "first_name": "Fake",
            "username": "fake_bot"
        }))
        .unwrap())
    }

    async fn get_updates(&self, window: FetchWindow) -> Result<Vec<Update>, BridgeError> {
        self.windows.lock().unwrap().push(window);
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send(&self, request: OutboundRequest) -> Result<Message, BridgeError> {
        if let Some(description) = self.send_error.lock().unwrap().clone() {
            return Err(BridgeError::Api { description });
        }
        let chat_id: i64 = request.chat_id.parse().unwrap_or(0);
        self.sent.lock().unwrap().push(request);
        Ok(serde_json::from_value(json!({
            "message_id": 100,
            "chat": {"id": chat_id},
            "date": 1_700_000_000
        }))
        .unwrap())
    }

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, BridgeError> {
        match self.files.lock().unwrap().get(file_id) {
            Some((path, _)) => Ok(RemoteFile {
                file_path: Some(path.clone()),
            }),
            None => Err(BridgeError::Api {
                description: "Bad Request: invalid file_id".to_string(),
            }),
        }
    }

    async fn download(&self, file_path: &str) -> Result<Vec<u8>, BridgeError> {
        self.files
            .lock()
            .unwrap()
            .values()
            .find(|(path, _)| path == file_path)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| BridgeError::Api {
                description: "file download failed with HTTP 404 Not Found".to_string(),
            })
    }
}

/// Text message update from a user named Alice in chat 42.
pub fn text_update(update_id: u64, text: &str) -> Update {
    serde_json::from_value(json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": {"id": 7, "is_bot": false, "first_name": "Alice", "username": "alice"},
            "chat": {"id": 42, "type": "private"},
            "date": 1_700_000_000,
            "text": text
        }
    }))
    .unwrap()
}

/// Update wrapping an arbitrary message body; sender and chat are filled in.
pub fn message_update(update_id: u64, body: serde_json::Value) -> Update {
    let mut message = json!({
        "message_id": update_id,
        "from": {"id": 7, "is_bot": false, "first_name": "Alice"},
        "chat": {"id": 42, "type": "private"},
        "date": 1_700_000_000
    });
    if let (Some(target), Some(extra)) = (message.as_object_mut(), body.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(json!({ "update_id": update_id, "message": message })).unwrap()
}
