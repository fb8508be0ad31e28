use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::{ChannelActivity, ChatPulseError, ChatRoom, ChatUser, MetricKey, Result};

/// The only presence state that counts a member as inactive.
pub const AWAY: &str = "away";

/// Member id -> presence state.
pub type PresenceMap = HashMap<String, String>;

pub fn presence_map(users: &[ChatUser]) -> PresenceMap {
    users
        .iter()
        .filter_map(|u| u.presence.as_ref().map(|p| (u.id.clone(), p.clone())))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberCounts {
    pub active: u64,
    pub inactive: u64,
}

/// Splits a member list into active and inactive counts.
///
/// A member is inactive iff their presence is exactly `"away"`. Members missing
/// from `presence` count as active.
pub fn count_members<S: AsRef<str>>(member_ids: &[S], presence: &PresenceMap) -> MemberCounts {
    member_ids
        .iter()
        .fold(MemberCounts::default(), |mut counts, member| {
            match presence.get(member.as_ref()) {
                Some(state) if state == AWAY => counts.inactive += 1,
                _ => counts.active += 1,
            }
            counts
        })
}

impl ChannelActivity {
    pub fn from_room(room: &ChatRoom, presence: &PresenceMap, message_count: u64) -> Self {
        let counts = count_members(&room.member_ids, presence);
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            room_type: room.room_type,
            member_count: room.member_ids.len() as u64,
            active_member_count: counts.active,
            inactive_member_count: counts.inactive,
            message_count,
        }
    }
}

/// All rooms sampled in one cycle, keyed and iterated by room name.
///
/// Duplicate names follow last-write-wins; the replaced record is returned and
/// logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityBatch {
    rooms: BTreeMap<String, ChannelActivity>,
}

impl ActivityBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record after checking its member counts. Inconsistent records are
    /// rejected and leave the batch untouched.
    pub fn insert(&mut self, activity: ChannelActivity) -> Result<Option<ChannelActivity>> {
        activity.validate()?;
        let replaced = self.rooms.insert(activity.name.clone(), activity);
        if let Some(old) = &replaced {
            warn!(
                "Duplicate room name {:?}: {} {} replaced by a later record",
                old.name, old.room_type, old.id
            );
        }
        Ok(replaced)
    }

    /// Builds a batch, returning the records that failed validation alongside it.
    pub fn collect<I>(activities: I) -> (Self, Vec<ChatPulseError>)
    where
        I: IntoIterator<Item = ChannelActivity>,
    {
        let mut batch = Self::new();
        let mut rejected = Vec::new();
        for activity in activities {
            if let Err(e) = batch.insert(activity) {
                rejected.push(e);
            }
        }
        (batch, rejected)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ChannelActivity> {
        self.rooms.get(name)
    }

    /// Records in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelActivity> {
        self.rooms.values()
    }

    pub fn values(&self, metric: MetricKey) -> impl Iterator<Item = u64> + '_ {
        self.rooms.values().map(move |a| a.value(metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoomType;

    fn presence(entries: &[(&str, &str)]) -> PresenceMap {
        entries
            .iter()
            .map(|(id, state)| (id.to_string(), state.to_string()))
            .collect()
    }

    fn activity(name: &str, id: &str) -> ChannelActivity {
        ChannelActivity {
            id: id.into(),
            name: name.into(),
            room_type: RoomType::Channel,
            member_count: 2,
            active_member_count: 1,
            inactive_member_count: 1,
            message_count: 0,
        }
    }

    #[test]
    fn test_all_away_is_all_inactive() {
        let p = presence(&[("U1", "away"), ("U2", "away"), ("U3", "away")]);
        let counts = count_members(&["U1", "U2", "U3"], &p);
        assert_eq!((counts.active, counts.inactive), (0, 3));
    }

    #[test]
    fn test_none_away_is_all_active() {
        let p = presence(&[("U1", "active"), ("U2", "dnd")]);
        let counts = count_members(&["U1", "U2"], &p);
        assert_eq!((counts.active, counts.inactive), (2, 0));
    }

    #[test]
    fn test_missing_presence_counts_as_active() {
        let p = presence(&[("U1", "away")]);
        let counts = count_members(&["U1", "U404"], &p);
        assert_eq!((counts.active, counts.inactive), (1, 1));
    }

    #[test]
    fn test_presence_match_is_exact() {
        let p = presence(&[("U1", "Away"), ("U2", "away ")]);
        let counts = count_members(&["U1", "U2"], &p);
        assert_eq!(counts.inactive, 0);
    }

    #[test]
    fn test_presence_map_skips_unknown_presence() {
        let users = vec![
            ChatUser {
                id: "U1".into(),
                presence: Some("away".into()),
            },
            ChatUser {
                id: "U2".into(),
                presence: None,
            },
        ];
        let map = presence_map(&users);
        assert_eq!(map.len(), 1);
        assert_eq!(map["U1"], "away");
    }

    #[test]
    fn test_from_room_keeps_counts_consistent() {
        let room = ChatRoom {
            id: "G1".into(),
            name: "buildit".into(),
            room_type: RoomType::Group,
            member_ids: vec!["U1".into(), "U2".into(), "U3".into()],
        };
        let a = ChannelActivity::from_room(&room, &presence(&[("U2", "away")]), 7);
        assert_eq!(a.member_count, 3);
        assert_eq!(a.active_member_count + a.inactive_member_count, a.member_count);
        assert_eq!(a.room_type, RoomType::Group);
        assert_eq!(a.message_count, 7);
    }

    #[test]
    fn test_batch_orders_by_name_and_last_write_wins() {
        let mut batch = ActivityBatch::new();
        batch.insert(activity("zeta", "C3")).unwrap();
        batch.insert(activity("alpha", "C1")).unwrap();
        let replaced = batch.insert(activity("zeta", "C9")).unwrap();
        assert_eq!(replaced.map(|a| a.id), Some("C3".to_string()));
        let names: Vec<&str> = batch.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(batch.get("zeta").unwrap().id, "C9");
    }

    #[test]
    fn test_collect_excludes_inconsistent_records() {
        let mut broken = activity("broken", "C2");
        broken.inactive_member_count = 5;
        let (batch, rejected) = ActivityBatch::collect(vec![activity("ok", "C1"), broken]);
        assert_eq!(batch.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert!(batch.get("broken").is_none());
    }
}
