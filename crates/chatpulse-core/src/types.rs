use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ChatPulseError, Result};

/// Kind of chat room. Groups are access-restricted channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Channel,
    Group,
}

impl RoomType {
    pub const ALL: [RoomType; 2] = [RoomType::Channel, RoomType::Group];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Channel => "channel",
            RoomType::Group => "group",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = ChatPulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "channel" => Ok(RoomType::Channel),
            "group" => Ok(RoomType::Group),
            other => Err(ChatPulseError::Parse(format!("unknown room type: {}", other))),
        }
    }
}

/// The four quantities visualized for every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    Members,
    ActiveMembers,
    InactiveMembers,
    Messages,
}

impl MetricKey {
    /// Emission order for metric nodes and links.
    pub const ALL: [MetricKey; 4] = [
        MetricKey::Members,
        MetricKey::ActiveMembers,
        MetricKey::InactiveMembers,
        MetricKey::Messages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKey::Members => "members",
            MetricKey::ActiveMembers => "activeMembers",
            MetricKey::InactiveMembers => "inactiveMembers",
            MetricKey::Messages => "messages",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            MetricKey::Members => 0,
            MetricKey::ActiveMembers => 1,
            MetricKey::InactiveMembers => 2,
            MetricKey::Messages => 3,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity counters for one channel or group, built fresh every sampling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelActivity {
    pub id: String,
    pub name: String,
    pub room_type: RoomType,
    pub member_count: u64,
    pub active_member_count: u64,
    pub inactive_member_count: u64,
    pub message_count: u64,
}

impl ChannelActivity {
    pub fn value(&self, metric: MetricKey) -> u64 {
        match metric {
            MetricKey::Members => self.member_count,
            MetricKey::ActiveMembers => self.active_member_count,
            MetricKey::InactiveMembers => self.inactive_member_count,
            MetricKey::Messages => self.message_count,
        }
    }

    /// Checks `active + inactive == members`.
    pub fn validate(&self) -> Result<()> {
        let classified = self
            .active_member_count
            .checked_add(self.inactive_member_count);
        if classified != Some(self.member_count) {
            return Err(ChatPulseError::DataInconsistency {
                room: self.name.clone(),
                detail: format!(
                    "{} active + {} inactive != {} members",
                    self.active_member_count, self.inactive_member_count, self.member_count
                ),
            });
        }
        Ok(())
    }
}
