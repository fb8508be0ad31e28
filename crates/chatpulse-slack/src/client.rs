use async_trait::async_trait;
use chatpulse_core::{
    ChatPlatform, ChatPulseError, ChatRoom, ChatUser, Result, RoomType, SlackConfig,
};
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::responses::{parse_envelope, History, RoomList, UsersList};

/// Largest page the history endpoints return.
const HISTORY_PAGE_SIZE: u32 = 1000;

/// Slack Web API client.
pub struct SlackClient {
    client: Client,
    api_base: String,
    token: SecretString,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| ChatPulseError::Config("slack.token is not set".to_string()))?;
        Self::with_token(&config.api_base, token, config.timeout())
    }

    pub fn with_token(api_base: &str, token: SecretString, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatPulseError::Network(format!("building Slack client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("Calling Slack {}", method);
        let response = self
            .client
            .get(self.method_url(method))
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(method, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("?")
                .to_string();
            return Err(ChatPulseError::External(format!(
                "{} rate limited, retry after {}s",
                method, retry_after
            )));
        }
        if !status.is_success() {
            return Err(ChatPulseError::External(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let raw = response.text().await.map_err(|e| request_error(method, e))?;
        parse_envelope(method, &raw)
    }
}

fn request_error(method: &str, e: reqwest::Error) -> ChatPulseError {
    if e.is_timeout() {
        ChatPulseError::Timeout(format!("Slack {}: {}", method, e))
    } else {
        ChatPulseError::Network(format!("Slack {}: {}", method, e))
    }
}

fn list_method(room_type: RoomType) -> &'static str {
    match room_type {
        RoomType::Channel => "channels.list",
        RoomType::Group => "groups.list",
    }
}

fn history_method(room_type: RoomType) -> &'static str {
    match room_type {
        RoomType::Channel => "channels.history",
        RoomType::Group => "groups.history",
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn list_users(&self) -> Result<Vec<ChatUser>> {
        let users: UsersList = self
            .call("users.list", &[("presence", "true".to_string())])
            .await?;
        Ok(users.members.into_iter().map(Into::into).collect())
    }

    async fn list_rooms(&self, room_type: RoomType) -> Result<Vec<ChatRoom>> {
        let list: RoomList = self.call(list_method(room_type), &[]).await?;
        Ok(list.into_rooms(room_type))
    }

    async fn count_messages(&self, room: &ChatRoom, oldest: DateTime<Utc>) -> Result<u64> {
        let history: History = self
            .call(
                history_method(room.room_type),
                &[
                    ("channel", room.id.clone()),
                    ("oldest", oldest.timestamp().to_string()),
                    ("count", HISTORY_PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        if history.has_more {
            warn!(
                "{} {} has more than {} messages since {}; count is truncated",
                room.room_type, room.name, HISTORY_PAGE_SIZE, oldest
            );
        }
        Ok(history.messages.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_base: &str) -> SlackClient {
        SlackClient::with_token(
            api_base,
            SecretString::from("xoxb-test".to_string()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[test]
    fn test_method_url_trims_trailing_slash() {
        assert_eq!(
            client("https://slack.com/api/").method_url("users.list"),
            "https://slack.com/api/users.list"
        );
    }

    #[test]
    fn test_methods_follow_room_type() {
        assert_eq!(list_method(RoomType::Group), "groups.list");
        assert_eq!(history_method(RoomType::Channel), "channels.history");
    }

    #[test]
    fn test_new_requires_token() {
        let err = SlackClient::new(&SlackConfig::default()).err().unwrap();
        assert!(matches!(err, ChatPulseError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let err = client("http://127.0.0.1:9").list_users().await.unwrap_err();
        assert!(matches!(
            err,
            ChatPulseError::Network(_) | ChatPulseError::Timeout(_)
        ));
    }
}
