// ABOUTME: One sampling cycle: retrieve room activity, synthesize the graph, submit it
// ABOUTME: Each stage takes the previous stage's output; any retrieval failure abandons the cycle

use anyhow::{Context, Result};
use chatpulse_core::{
    presence_map, synthesize_graph, ActivityBatch, ActivityGraph, ChannelActivity, ChatPlatform,
    ChatRoom, ColorTable, GraphStore, PresenceMap, RoomType, Settings,
};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};

/// Timestamps and labels derived from the cycle's start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    pub started_at: DateTime<Utc>,
    /// Messages older than this are not counted.
    pub oldest: DateTime<Utc>,
    pub commit_message: String,
    pub event_name: String,
}

impl CyclePlan {
    pub fn new(started_at: DateTime<Utc>, lookback: Duration) -> Self {
        let lookback = TimeDelta::from_std(lookback).unwrap_or(TimeDelta::MAX);
        let oldest = started_at
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            started_at,
            oldest,
            commit_message: format!("{}:00 event created", started_at.format("%H")),
            event_name: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Presence data and the tracked rooms found on the platform.
#[derive(Debug, Clone, Default)]
pub struct RoomSnapshot {
    pub presence: PresenceMap,
    pub rooms: Vec<ChatRoom>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Submitted {
        rooms: usize,
        nodes: usize,
        links: usize,
    },
    /// Nothing matched the configured rooms; submission was skipped.
    Skipped,
}

/// Lists users and rooms, keeping only rooms configured for their room type.
pub async fn collect_rooms(
    platform: &dyn ChatPlatform,
    tracked: &ColorTable,
) -> Result<RoomSnapshot> {
    let users = platform.list_users().await.context("listing users")?;
    let mut snapshot = RoomSnapshot {
        presence: presence_map(&users),
        rooms: Vec::new(),
    };

    for room_type in RoomType::ALL {
        let configured = tracked.rooms(room_type);
        if configured.is_empty() {
            continue;
        }
        let listed = platform
            .list_rooms(room_type)
            .await
            .with_context(|| format!("listing {}s", room_type))?;
        let before = snapshot.rooms.len();
        snapshot.rooms.extend(
            listed
                .into_iter()
                .filter(|r| configured.contains_key(&r.name)),
        );
        let found = snapshot.rooms.len() - before;
        if found < configured.len() {
            let missing: Vec<&str> = configured
                .keys()
                .filter(|name| !snapshot.rooms[before..].iter().any(|r| &r.name == *name))
                .map(String::as_str)
                .collect();
            warn!("Configured {}s not found: {}", room_type, missing.join(", "));
        }
        debug!("Tracking {} of {} configured {}s", found, configured.len(), room_type);
    }
    Ok(snapshot)
}

/// Fetches every room's message count concurrently, then builds the batch.
///
/// A single failed request fails the whole stage.
pub async fn collect_activity(
    platform: &dyn ChatPlatform,
    snapshot: &RoomSnapshot,
    oldest: DateTime<Utc>,
) -> Result<ActivityBatch> {
    let counts = try_join_all(snapshot.rooms.iter().map(|room| async move {
        platform
            .count_messages(room, oldest)
            .await
            .with_context(|| format!("reading history of {} {}", room.room_type, room.name))
    }))
    .await?;

    let activities = snapshot
        .rooms
        .iter()
        .zip(counts)
        .map(|(room, messages)| ChannelActivity::from_room(room, &snapshot.presence, messages));
    let (batch, rejected) = ActivityBatch::collect(activities);
    for e in rejected {
        warn!("Excluding room from graph: {}", e);
    }
    Ok(batch)
}

/// Runs retrieval and synthesis. Returns `None` when no configured room was found.
pub async fn build_graph(
    platform: &dyn ChatPlatform,
    settings: &Settings,
    plan: &CyclePlan,
) -> Result<Option<(ActivityBatch, ActivityGraph)>> {
    let snapshot = collect_rooms(platform, &settings.rooms).await?;
    let batch = collect_activity(platform, &snapshot, plan.oldest).await?;
    if batch.is_empty() {
        return Ok(None);
    }
    let graph = synthesize_graph(&batch, &settings.rooms, settings.scale, &plan.commit_message)?;
    Ok(Some((batch, graph)))
}

/// Submits the graph over the latest revision and records an event for it.
pub async fn submit_graph(
    store: &dyn GraphStore,
    graph: &ActivityGraph,
    plan: &CyclePlan,
) -> Result<()> {
    store.login().await.context("logging in to graph store")?;
    let resource = store
        .fetch_resource()
        .await
        .context("fetching graph revision")?;
    store
        .submit(&resource, graph)
        .await
        .with_context(|| format!("patching graph over revision {}", resource.revision))?;
    let latest = store
        .fetch_resource()
        .await
        .context("fetching submitted revision")?;
    store
        .create_event(&latest, &plan.event_name)
        .await
        .with_context(|| format!("creating event {}", plan.event_name))?;
    Ok(())
}

/// One full cycle. Nothing is submitted unless every stage before submission
/// succeeded.
pub async fn run_cycle(
    platform: &dyn ChatPlatform,
    store: &dyn GraphStore,
    settings: &Settings,
    started_at: DateTime<Utc>,
) -> Result<CycleOutcome> {
    let plan = CyclePlan::new(started_at, settings.schedule.lookback());
    let span = info_span!("cycle", started_at = %plan.event_name);
    execute(platform, store, settings, &plan).instrument(span).await
}

async fn execute(
    platform: &dyn ChatPlatform,
    store: &dyn GraphStore,
    settings: &Settings,
    plan: &CyclePlan,
) -> Result<CycleOutcome> {
    let Some((batch, graph)) = build_graph(platform, settings, plan).await? else {
        info!("No configured rooms found; skipping submission");
        return Ok(CycleOutcome::Skipped);
    };
    submit_graph(store, &graph, plan).await?;
    info!(
        "Snapshot placed: {} rooms, {} nodes, {} links",
        batch.len(),
        graph.nodes.len(),
        graph.links.len()
    );
    Ok(CycleOutcome::Submitted {
        rooms: batch.len(),
        nodes: graph.nodes.len(),
        links: graph.links.len(),
    })
}
