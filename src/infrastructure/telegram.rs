use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::errors::NotificationError;
use crate::domain::notification::OutboundMessage;
use crate::domain::ports::Messenger;

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram refuses photo captions longer than this.
const CAPTION_LIMIT: usize = 1024;

impl From<reqwest::Error> for NotificationError {
    fn from(e: reqwest::Error) -> Self {
        NotificationError::DeliveryFailed(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub from: Option<Sender>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub first_name: String,
}

/// Bot API client. One `reqwest::Client` is shared by every call.
#[derive(Debug, Clone)]
pub struct TelegramBot {
    client: Client,
    base_url: String,
    media_base_url: Option<String>,
}

impl TelegramBot {
    pub fn new(
        token: &str,
        media_base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        Self::with_api_base(TELEGRAM_API, token, media_base_url, timeout)
    }

    pub fn with_api_base(
        api_base: &str,
        token: &str,
        media_base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            media_base_url: media_base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, NotificationError> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let reply: ApiReply<T> = response.json().await?;
        if !reply.ok {
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                description: reply.description.unwrap_or_default(),
            });
        }
        reply.result.ok_or_else(|| {
            NotificationError::DeliveryFailed(format!("{} returned no result", method))
        })
    }

    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), NotificationError> {
        self.call::<Value>("sendMessage", &json!({ "chat_id": chat_id, "text": text }), None)
            .await
            .map(|_| ())
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), NotificationError> {
        self.call::<Value>(
            "sendPhoto",
            &json!({ "chat_id": chat_id, "photo": photo_url, "caption": caption }),
            None,
        )
        .await
        .map(|_| ())
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, NotificationError> {
        let body = json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        // the HTTP request has to outlive the server-side poll
        self.call("getUpdates", &body, Some(poll_timeout + Duration::from_secs(10)))
            .await
    }

    fn photo_url(&self, image: &str) -> Option<String> {
        if image.starts_with("http://") || image.starts_with("https://") {
            return Some(image.to_string());
        }
        self.media_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, image.trim_start_matches('/')))
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        let photo = message
            .image
            .as_deref()
            .and_then(|image| self.photo_url(image))
            .filter(|_| message.text.chars().count() <= CAPTION_LIMIT);

        match photo {
            Some(url) => self.send_photo(message.chat_id, &url, &message.text).await,
            None => self.send_text(message.chat_id, &message.text).await,
        }
    }
}

/// Used when no bot token is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyMessenger;

#[async_trait]
impl Messenger for LogOnlyMessenger {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        log::info!(
            "BOT_TOKEN not set, not delivering notification to chat {}:\n{}",
            message.chat_id,
            message.text
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(media: Option<&str>) -> TelegramBot {
        TelegramBot::with_api_base(
            "https://api.example.test/",
            "123:abc",
            media.map(str::to_string),
            Duration::from_secs(1),
        )
        .expect("client builds")
    }

    #[test]
    fn builds_method_base_url() {
        assert_eq!(bot(None).base_url, "https://api.example.test/bot123:abc");
    }

    #[test]
    fn relative_images_need_media_base() {
        assert_eq!(bot(None).photo_url("product_additional_images/a.jpg"), None);
        assert_eq!(
            bot(Some("https://cdn.example.test/media/"))
                .photo_url("/product_additional_images/a.jpg"),
            Some("https://cdn.example.test/media/product_additional_images/a.jpg".to_string())
        );
    }

    #[test]
    fn absolute_images_pass_through() {
        assert_eq!(
            bot(None).photo_url("https://img.example.test/a.jpg"),
            Some("https://img.example.test/a.jpg".to_string())
        );
    }

    #[test]
    fn parses_get_updates_reply() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 99, "type": "private"},
                 "from": {"id": 555, "is_bot": false, "first_name": "Seller"}, "text": "/start tok"}},
                {"update_id": 11}
            ]
        }"#;
        let reply: ApiReply<Vec<Update>> = serde_json::from_str(raw).expect("parse");
        let updates = reply.result.expect("result");
        assert_eq!(updates.len(), 2);
        let message = updates[0].message.as_ref().expect("message");
        assert_eq!(message.chat.id, 99);
        assert_eq!(message.from.as_ref().map(|f| f.id), Some(555));
        assert_eq!(message.text.as_deref(), Some("/start tok"));
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn parses_error_reply() {
        let raw = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let reply: ApiReply<Value> = serde_json::from_str(raw).expect("parse");
        assert!(!reply.ok);
        assert!(reply.result.is_none());
        assert_eq!(
            reply.description.as_deref(),
            Some("Forbidden: bot was blocked by the user")
        );
    }
}
