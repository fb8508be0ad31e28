use chatpulse_core::{ChatPulseError, ChatRoom, ChatUser, Result, RoomType};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Every Web API response carries `ok` and, on failure, an `error` code.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

/// Error codes that mean the token itself is unusable.
const AUTH_ERRORS: [&str; 4] = ["not_authed", "invalid_auth", "account_inactive", "token_revoked"];

pub(crate) fn parse_envelope<T: DeserializeOwned>(method: &str, raw: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(raw)
        .map_err(|e| ChatPulseError::Parse(format!("{} response: {}", method, e)))?;
    if envelope.ok {
        return Ok(envelope.body);
    }
    let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
    if AUTH_ERRORS.contains(&code.as_str()) {
        Err(ChatPulseError::Auth(format!("{}: {}", method, code)))
    } else {
        Err(ChatPulseError::External(format!("{}: {}", method, code)))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersList {
    #[serde(default)]
    pub members: Vec<SlackUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub presence: Option<String>,
}

impl From<SlackUser> for ChatUser {
    fn from(user: SlackUser) -> Self {
        ChatUser {
            id: user.id,
            presence: user.presence,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RoomList {
    #[serde(default)]
    pub channels: Vec<SlackRoom>,
    #[serde(default)]
    pub groups: Vec<SlackRoom>,
}

impl RoomList {
    pub fn into_rooms(self, room_type: RoomType) -> Vec<ChatRoom> {
        let rooms = match room_type {
            RoomType::Channel => self.channels,
            RoomType::Group => self.groups,
        };
        rooms
            .into_iter()
            .map(|r| ChatRoom {
                id: r.id,
                name: r.name,
                room_type,
                member_ids: r.members,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SlackRoom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct History {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_list_parses_presence() {
        let raw = r#"{"ok":true,"members":[{"id":"U1","presence":"away","name":"a"},{"id":"U2"}]}"#;
        let users: UsersList = parse_envelope("users.list", raw).unwrap();
        let users: Vec<ChatUser> = users.members.into_iter().map(Into::into).collect();
        assert_eq!(users[0].presence.as_deref(), Some("away"));
        assert_eq!(users[1].presence, None);
    }

    #[test]
    fn test_room_list_selects_by_type() {
        let raw = r#"{"ok":true,"groups":[{"id":"G1","name":"buildit","members":["U1","U2"]}]}"#;
        let list: RoomList = parse_envelope("groups.list", raw).unwrap();
        let rooms = list.into_rooms(RoomType::Group);
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_type, RoomType::Group);
        assert_eq!(rooms[0].member_ids, vec!["U1", "U2"]);
    }

    #[test]
    fn test_history_counts_messages() {
        let raw = r#"{"ok":true,"messages":[{"ts":"1.0"},{"ts":"2.0"}],"has_more":false}"#;
        let history: History = parse_envelope("channels.history", raw).unwrap();
        assert_eq!(history.messages.len(), 2);
        assert!(!history.has_more);
    }

    #[test]
    fn test_error_codes_map_to_error_kinds() {
        let err = parse_envelope::<History>(
            "channels.history",
            r#"{"ok":false,"error":"invalid_auth"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ChatPulseError::Auth(_)));

        let err = parse_envelope::<History>(
            "channels.history",
            r#"{"ok":false,"error":"channel_not_found"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ChatPulseError::External(ref m) if m.contains("channel_not_found")));

        let err = parse_envelope::<History>("channels.history", "<html>").unwrap_err();
        assert!(matches!(err, ChatPulseError::Parse(_)));
    }
}
