use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::{
    domain::message::{CurrentUser, GroupId, Message, MessageId},
    sync::{
        contracts::{SnapshotSource, SnapshotSourceError},
        frames::WireMessage,
    },
    usecases::contracts::ChatBackend,
};

use super::error::ApiError;

const SNAPSHOT_ENTRY_SKIPPED: &str = "SYNC_SNAPSHOT_ENTRY_SKIPPED";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const AUTH_COOKIE: &str = "access_token";

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: i64,
    name: String,
}

/// REST client for the expense service. Authenticates with the session cookie.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::Unavailable)?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let response = check_status(self.request(Method::GET, "/auth/me").send().await?)?;
        let me: MeResponse = response
            .json()
            .await
            .map_err(|error| ApiError::Decode(error.to_string()))?;

        Ok(CurrentUser {
            id: me.id,
            name: me.name,
        })
    }

    pub async fn fetch_group_messages(&self, group_id: GroupId) -> Result<Vec<Message>, ApiError> {
        let path = format!("/chat/{group_id}/messages");
        let response = check_status(self.request(Method::GET, &path).send().await?)?;
        let entries: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|error| ApiError::Decode(error.to_string()))?;

        Ok(decode_snapshot(entries))
    }

    pub async fn mark_read(&self, message_id: &MessageId) -> Result<(), ApiError> {
        let path = format!("/chat/read/{}", urlencoding::encode(message_id.as_str()));
        check_status(self.request(Method::POST, &path).send().await?)?;
        Ok(())
    }

    /// `ws(s)://<base>/chat/ws/<group>?token=<token>`.
    pub fn live_channel_url(&self, group_id: GroupId) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };

        let url = format!("{ws_base}/chat/ws/{group_id}");
        match self.token.as_deref() {
            Some(token) => format!("{url}?token={}", urlencoding::encode(token)),
            None => url,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));
        match self.token.as_deref() {
            Some(token) => builder.header(header::COOKIE, format!("{AUTH_COOKIE}={token}")),
            None => builder,
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl SnapshotSource for ApiClient {
    async fn fetch_messages(&self, group_id: GroupId) -> Result<Vec<Message>, SnapshotSourceError> {
        Ok(self.fetch_group_messages(group_id).await?)
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        ApiClient::current_user(self).await
    }

    async fn mark_read(&self, message_id: &MessageId) -> Result<(), ApiError> {
        ApiClient::mark_read(self, message_id).await
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Unavailable(error.without_url())
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    match status_error(response.status()) {
        Some(error) => Err(error),
        None => Ok(response),
    }
}

fn status_error(status: StatusCode) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }

    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound,
        other => ApiError::Status(other.as_u16()),
    })
}

/// Decodes snapshot entries one by one; malformed entries are skipped.
fn decode_snapshot(entries: Vec<serde_json::Value>) -> Vec<Message> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let decoded = serde_json::from_value::<WireMessage>(entry)
                .map_err(|error| error.to_string())
                .and_then(|wire| wire.into_message(None).map_err(|error| error.to_string()));

            match decoded {
                Ok(message) => Some(message),
                Err(reason) => {
                    tracing::warn!(
                        code = SNAPSHOT_ENTRY_SKIPPED,
                        index,
                        reason = %reason,
                        "snapshot entry skipped"
                    );
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::message::MessageKind;

    fn client(base_url: &str, token: Option<&str>) -> ApiClient {
        ApiClient::new(base_url, token.map(str::to_owned)).expect("client should build")
    }

    #[test]
    fn rejects_base_url_without_http_scheme() {
        assert!(matches!(
            ApiClient::new("localhost:8000", None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn live_channel_url_switches_scheme_and_carries_token() {
        let plain = client("http://localhost:8000/", Some("a b"));
        let secure = client("https://split.example", None);

        assert_eq!(
            plain.live_channel_url(GroupId(4)),
            "ws://localhost:8000/chat/ws/4?token=a%20b"
        );
        assert_eq!(
            secure.live_channel_url(GroupId(4)),
            "wss://split.example/chat/ws/4"
        );
    }

    #[test]
    fn status_mapping_follows_service_semantics() {
        assert!(status_error(StatusCode::OK).is_none());
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED),
            Some(ApiError::Unauthorized)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN),
            Some(ApiError::Unauthorized)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND),
            Some(ApiError::NotFound)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY),
            Some(ApiError::Status(502))
        ));
    }

    #[test]
    fn decodes_user_and_bot_entries_and_skips_broken_ones() {
        let entries = vec![
            json!({
                "id": 1,
                "content": "hi",
                "sender_id": 7,
                "sender_name": "Alice",
                "timestamp": "2026-02-14T10:00:00.123456",
                "type": "user"
            }),
            json!({
                "id": 2,
                "content": "Alice added 300",
                "timestamp": "2026-02-14T10:01:00",
                "type": "bot"
            }),
            json!({"id": 3, "content": "no timestamp"}),
            json!({
                "id": 4,
                "content": "bad time",
                "timestamp": "yesterday",
                "type": "user"
            }),
        ];

        let messages = decode_snapshot(entries);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::User);
        assert_eq!(messages[0].sender_name.as_deref(), Some("Alice"));
        assert_eq!(messages[1].kind, MessageKind::Bot);
        assert_eq!(messages[1].sender_id, None);
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", client("http://localhost:8000", Some("jwt-value")));

        assert!(!rendered.contains("jwt-value"));
    }
}
