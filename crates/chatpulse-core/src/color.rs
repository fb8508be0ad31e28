use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ChannelActivity, MetricKey, RoomType};

/// Severity color assigned to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// Metric carries no inherent severity.
    Neutral,
    Healthy,
    Watch,
    /// Activity is below the low threshold.
    Alert,
}

impl Color {
    pub fn hex(&self) -> &'static str {
        match self {
            Color::Alert => "#cc0000",
            Color::Watch => "#cccc00",
            Color::Healthy => "#006600",
            Color::Neutral => "#0066ff",
        }
    }
}

/// `(low, high)` thresholds, written as `[low, high]` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct ColorBand {
    pub low: u64,
    pub high: u64,
}

impl ColorBand {
    pub fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    /// Boundary values belong to the higher bucket.
    pub fn classify(&self, value: u64) -> Color {
        if value < self.low {
            Color::Alert
        } else if value < self.high {
            Color::Watch
        } else {
            Color::Healthy
        }
    }
}

impl From<[u64; 2]> for ColorBand {
    fn from([low, high]: [u64; 2]) -> Self {
        Self { low, high }
    }
}

impl From<ColorBand> for [u64; 2] {
    fn from(band: ColorBand) -> Self {
        [band.low, band.high]
    }
}

/// Bands configured for a single room. Any metric left out renders neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<ColorBand>,
    #[serde(default, alias = "activeMembers", skip_serializing_if = "Option::is_none")]
    pub active_members: Option<ColorBand>,
    #[serde(default, alias = "inactiveMembers", skip_serializing_if = "Option::is_none")]
    pub inactive_members: Option<ColorBand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<ColorBand>,
}

impl RoomBands {
    pub fn band(&self, metric: MetricKey) -> Option<ColorBand> {
        match metric {
            MetricKey::Members => self.members,
            MetricKey::ActiveMembers => self.active_members,
            MetricKey::InactiveMembers => self.inactive_members,
            MetricKey::Messages => self.messages,
        }
    }

    pub fn bands(&self) -> impl Iterator<Item = (MetricKey, ColorBand)> + '_ {
        MetricKey::ALL
            .into_iter()
            .filter_map(|m| self.band(m).map(|b| (m, b)))
    }
}

/// Room type -> room name -> metric bands. Doubles as the list of rooms to sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTable {
    #[serde(default)]
    pub channel: BTreeMap<String, RoomBands>,
    #[serde(default)]
    pub group: BTreeMap<String, RoomBands>,
}

impl ColorTable {
    pub fn rooms(&self, room_type: RoomType) -> &BTreeMap<String, RoomBands> {
        match room_type {
            RoomType::Channel => &self.channel,
            RoomType::Group => &self.group,
        }
    }

    pub fn is_tracked(&self, room_type: RoomType, name: &str) -> bool {
        self.rooms(room_type).contains_key(name)
    }

    pub fn band(&self, room_type: RoomType, name: &str, metric: MetricKey) -> Option<ColorBand> {
        self.rooms(room_type).get(name)?.band(metric)
    }

    pub fn classify(&self, activity: &ChannelActivity, metric: MetricKey) -> Color {
        self.band(activity.room_type, &activity.name, metric)
            .map_or(Color::Neutral, |band| band.classify(activity.value(metric)))
    }

    /// Most severe color among the room's banded metrics.
    pub fn entity_color(&self, activity: &ChannelActivity) -> Color {
        MetricKey::ALL
            .into_iter()
            .map(|m| self.classify(activity, m))
            .max()
            .unwrap_or(Color::Neutral)
    }
}
