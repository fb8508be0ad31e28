use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActivityGraph, Result, RoomType};

/// A workspace member and their presence state as reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    #[serde(default)]
    pub presence: Option<String>,
}

/// A channel or group listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    pub room_type: RoomType,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

/// Current state of the target graph resource in the graph store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphResource {
    /// Opaque revision token required for the next update.
    pub revision: String,
    pub url: String,
    pub events_url: String,
}

/// Read-only view of the chat platform, queried once per cycle.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn list_users(&self) -> Result<Vec<ChatUser>>;
    async fn list_rooms(&self, room_type: RoomType) -> Result<Vec<ChatRoom>>;
    /// Number of messages posted in `room` since `oldest`.
    async fn count_messages(&self, room: &ChatRoom, oldest: DateTime<Utc>) -> Result<u64>;
}

/// Remote graph store with optimistic-concurrency updates.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn login(&self) -> Result<()>;
    async fn fetch_resource(&self) -> Result<GraphResource>;
    /// Replaces nodes and links. Fails with `StaleRevision` when
    /// `resource.revision` is no longer current.
    async fn submit(&self, resource: &GraphResource, graph: &ActivityGraph) -> Result<()>;
    async fn create_event(&self, resource: &GraphResource, name: &str) -> Result<()>;
}
