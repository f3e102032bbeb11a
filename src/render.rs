use chrono::{DateTime, SecondsFormat};
use tracing::debug;

use crate::media::{Materialized, MediaStore};
use crate::telegram::{Attachment, Content, MediaKind, Message, TelegramApi, Update, User};

/// Render one update, downloading its attachment first when it has one.
pub async fn render_update(update: &Update, api: &dyn TelegramApi, media: &MediaStore) -> String {
    let outcome = match update.message().map(Message::content) {
        Some(Content::Media { attachment, .. }) => Some(media.materialize(api, &attachment).await),
        _ => None,
    };

    if let Some(Materialized::Unavailable { reason }) = &outcome {
        debug!(
            "Rendering update {} without a local copy: {}",
            update.update_id, reason
        );
    }

    render_line(update, outcome.as_ref())
}

/// `[timestamp] sender (chat id): summary`
pub fn render_line(update: &Update, outcome: Option<&Materialized>) -> String {
    let Some(message) = update.message() else {
        return format!("[update {}] (no message content)", update.update_id);
    };

    format!(
        "[{}] {} (chat {}): {}",
        format_timestamp(message.date),
        sender_display(message.from.as_ref()),
        message.chat.id,
        summarize(&message.content(), outcome)
    )
}

fn format_timestamp(unix_secs: i64) -> String {
    DateTime::from_timestamp(unix_secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| unix_secs.to_string())
}

fn sender_display(user: Option<&User>) -> String {
    let Some(user) = user else {
        return "unknown".to_string();
    };

    let mut name = user.first_name.clone();
    if let Some(last) = &user.last_name {
        name.push(' ');
        name.push_str(last);
    }
    if let Some(handle) = &user.username {
        name.push_str(&format!(" (@{})", handle));
    }
    name
}

fn summarize(content: &Content<'_>, outcome: Option<&Materialized>) -> String {
    match content {
        Content::Text(text) => text.to_string(),
        Content::Unsupported => "[unsupported message]".to_string(),
        Content::Media {
            attachment,
            caption,
        } => {
            let mut summary = format!("[{}", describe(attachment));
            if let Some(path) = outcome.and_then(Materialized::path) {
                summary.push_str(&format!(": {}", path.display()));
            }
            summary.push(']');
            if let Some(caption) = caption {
                summary.push_str(&format!(" Caption: {}", caption));
            }
            summary
        }
    }
}

fn describe(attachment: &Attachment<'_>) -> String {
    let label = attachment.kind.label();
    match attachment.kind {
        MediaKind::Document => format!("{} \"{}\"", label, attachment.display_name()),
        MediaKind::Sticker => match attachment.emoji {
            Some(emoji) => format!("{} {}", label, emoji),
            None => label.to_string(),
        },
        _ => match attachment.duration {
            Some(secs) => format!("{} {}s", label, secs),
            None => label.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::fake::{message_update, text_update, FakeTelegram};
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_text_line() {
        let line = render_line(&text_update(5, "hello"), None);
        assert_eq!(
            line,
            "[2023-11-14T22:13:20.000Z] Alice (@alice) (chat 42): hello"
        );
    }

    #[test]
    fn test_update_without_message() {
        let update: Update = serde_json::from_value(json!({"update_id": 9})).unwrap();
        assert_eq!(render_line(&update, None), "[update 9] (no message content)");
    }

    #[test]
    fn test_saved_photo_includes_path_and_caption() {
        let update = message_update(
            6,
            json!({
                "caption": "sunset",
                "photo": [{"file_id": "p1", "width": 10, "height": 10}]
            }),
        );
        let outcome = Materialized::Saved(PathBuf::from("/tmp/dl/1-photo.jpg"));
        let line = render_line(&update, Some(&outcome));
        assert!(
            line.ends_with("(chat 42): [Photo: /tmp/dl/1-photo.jpg] Caption: sunset"),
            "{}",
            line
        );
    }

    #[test]
    fn test_failed_download_omits_path_but_keeps_caption() {
        let update = message_update(
            7,
            json!({
                "caption": "minutes",
                "document": {"file_id": "d1", "file_name": "notes.txt"}
            }),
        );
        let outcome = Materialized::Unavailable {
            reason: "boom".to_string(),
        };
        let line = render_line(&update, Some(&outcome));
        assert!(
            line.ends_with("[Document \"notes.txt\"] Caption: minutes"),
            "{}",
            line
        );
    }

    #[test]
    fn test_voice_and_sticker_descriptions() {
        let voice = message_update(8, json!({"voice": {"file_id": "v", "duration": 4}}));
        assert!(render_line(&voice, None).ends_with("[Voice 4s]"));

        let sticker = message_update(9, json!({"sticker": {"file_id": "s", "emoji": "👍"}}));
        assert!(render_line(&sticker, None).ends_with("[Sticker 👍]"));
    }

    #[test]
    fn test_missing_sender_is_unknown() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 3,
            "channel_post": {
                "message_id": 3,
                "chat": {"id": -100, "type": "channel"},
                "date": 0,
                "text": "announcement"
            }
        }))
        .unwrap();
        assert_eq!(
            render_line(&update, None),
            "[1970-01-01T00:00:00.000Z] unknown (chat -100): announcement"
        );
    }

    #[tokio::test]
    async fn test_render_update_downloads_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let api = FakeTelegram::new();
        api.add_file("a1", "music/file_2.mp3", b"id3");

        let update = message_update(
            10,
            json!({"audio": {"file_id": "a1", "duration": 180}}),
        );
        let line = render_update(&update, &api, &media).await;

        assert!(line.contains("[Audio 180s: "), "{}", line);
        assert!(line.contains("-audio.mp3]"), "{}", line);
    }

    #[tokio::test]
    async fn test_render_update_degrades_when_download_fails() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let api = FakeTelegram::new();

        let update = message_update(11, json!({"video": {"file_id": "gone", "duration": 3}}));
        let line = render_update(&update, &api, &media).await;

        assert!(line.ends_with("[Video 3s]"), "{}", line);
    }
}
