//! Channel cache: channel records, the requesting user's memberships,
//! per-channel stats and member ID sets.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use riptide_shared::constants::DEFAULT_CHANNEL_NAME;
use riptide_shared::models::{Channel, ChannelKind, ChannelMember, ChannelStats};
use riptide_shared::types::{ChannelId, TeamId, UserId};

#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: HashMap<ChannelId, Channel>,
    /// The requesting user's membership rows, keyed by channel.
    my_members: HashMap<ChannelId, ChannelMember>,
    stats: HashMap<ChannelId, ChannelStats>,
    members: HashMap<ChannelId, HashSet<UserId>>,
}

impl ChannelStore {
    /// Insert or replace a channel. A record no newer than the cached
    /// one is ignored; returns whether the write was applied.
    pub fn upsert(&mut self, channel: Channel) -> bool {
        if let Some(existing) = self.channels.get(&channel.id) {
            if existing.update_at >= channel.update_at {
                debug!(channel = %channel.id, "ignoring stale channel update");
                return false;
            }
        }
        self.channels.insert(channel.id.clone(), channel);
        true
    }

    pub fn get(&self, id: &ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    pub fn mark_deleted(&mut self, id: &ChannelId, delete_at: i64) {
        if let Some(channel) = self.channels.get_mut(id) {
            channel.delete_at = delete_at;
        }
    }

    pub fn convert_to_private(&mut self, id: &ChannelId) {
        if let Some(channel) = self.channels.get_mut(id) {
            channel.kind = ChannelKind::Private;
        }
    }

    /// Drop a channel and everything keyed by it.
    pub fn remove(&mut self, id: &ChannelId) {
        self.channels.remove(id);
        self.my_members.remove(id);
        self.stats.remove(id);
        self.members.remove(id);
    }

    // -- own membership ----------------------------------------------------

    pub fn upsert_my_member(&mut self, member: ChannelMember) {
        self.my_members.insert(member.channel_id.clone(), member);
    }

    pub fn my_member(&self, id: &ChannelId) -> Option<&ChannelMember> {
        self.my_members.get(id)
    }

    pub fn leave(&mut self, id: &ChannelId) {
        self.my_members.remove(id);
    }

    pub fn set_unread(
        &mut self,
        id: &ChannelId,
        last_viewed_at: i64,
        msg_count: i64,
        mention_count: i64,
    ) {
        if let Some(member) = self.my_members.get_mut(id) {
            member.last_viewed_at = last_viewed_at;
            member.msg_count = msg_count;
            member.mention_count = mention_count;
        }
    }

    // -- stats and member sets ---------------------------------------------

    pub fn set_stats(&mut self, stats: ChannelStats) {
        self.stats.insert(stats.channel_id.clone(), stats);
    }

    pub fn stats(&self, id: &ChannelId) -> Option<&ChannelStats> {
        self.stats.get(id)
    }

    pub fn add_member(&mut self, channel_id: &ChannelId, user_id: UserId) {
        self.members
            .entry(channel_id.clone())
            .or_default()
            .insert(user_id);
    }

    pub fn remove_member(&mut self, channel_id: &ChannelId, user_id: &UserId) {
        if let Some(set) = self.members.get_mut(channel_id) {
            set.remove(user_id);
        }
    }

    pub fn is_member(&self, channel_id: &ChannelId, user_id: &UserId) -> bool {
        self.members
            .get(channel_id)
            .is_some_and(|set| set.contains(user_id))
    }

    // -- team-scoped views -------------------------------------------------

    pub fn channels_in_team(&self, team_id: &TeamId) -> Vec<&Channel> {
        let mut channels: Vec<&Channel> = self
            .channels
            .values()
            .filter(|c| c.team_id.as_ref() == Some(team_id))
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        channels
    }

    /// Landing channel for a team: its well-known default channel, or
    /// failing that the first live open channel by name.
    pub fn default_channel_for_team(&self, team_id: &TeamId) -> Option<&Channel> {
        let channels = self.channels_in_team(team_id);
        channels
            .iter()
            .find(|c| c.name == DEFAULT_CHANNEL_NAME && c.delete_at == 0)
            .or_else(|| {
                channels
                    .iter()
                    .find(|c| c.kind == ChannelKind::Open && c.delete_at == 0)
            })
            .copied()
    }

    /// Drop every channel belonging to a team; returns the removed IDs so
    /// the caller can evict dependent caches.
    pub fn remove_team_channels(&mut self, team_id: &TeamId) -> Vec<ChannelId> {
        let removed: Vec<ChannelId> = self
            .channels
            .values()
            .filter(|c| c.team_id.as_ref() == Some(team_id))
            .map(|c| c.id.clone())
            .collect();
        for id in &removed {
            self.remove(id);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.my_members.clear();
        self.stats.clear();
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, team: &str, name: &str, kind: ChannelKind, update_at: i64) -> Channel {
        Channel {
            id: ChannelId::from(id),
            team_id: Some(TeamId::from(team)),
            kind,
            name: name.to_string(),
            display_name: name.to_string(),
            create_at: 1,
            update_at,
            delete_at: 0,
        }
    }

    #[test]
    fn test_stale_update_is_ignored() {
        let mut store = ChannelStore::default();
        assert!(store.upsert(channel("c1", "t1", "dev", ChannelKind::Open, 200)));
        assert!(!store.upsert(channel("c1", "t1", "dev-old", ChannelKind::Open, 100)));
        assert!(!store.upsert(channel("c1", "t1", "dev-replay", ChannelKind::Open, 200)));
        assert_eq!(store.get(&ChannelId::from("c1")).unwrap().name, "dev");
    }

    #[test]
    fn test_default_channel_prefers_town_square() {
        let mut store = ChannelStore::default();
        let team = TeamId::from("t1");
        store.upsert(channel("c1", "t1", "aardvark", ChannelKind::Open, 1));
        store.upsert(channel("c2", "t1", DEFAULT_CHANNEL_NAME, ChannelKind::Open, 1));
        assert_eq!(
            store.default_channel_for_team(&team).unwrap().id,
            ChannelId::from("c2")
        );
    }

    #[test]
    fn test_default_channel_falls_back_to_first_open() {
        let mut store = ChannelStore::default();
        let team = TeamId::from("t1");
        store.upsert(channel("c1", "t1", "zebra", ChannelKind::Open, 1));
        store.upsert(channel("c2", "t1", "apple", ChannelKind::Private, 1));
        store.upsert(channel("c3", "t1", "mango", ChannelKind::Open, 1));
        assert_eq!(
            store.default_channel_for_team(&team).unwrap().id,
            ChannelId::from("c3")
        );
    }

    #[test]
    fn test_remove_team_channels_reports_removed_ids() {
        let mut store = ChannelStore::default();
        store.upsert(channel("c1", "t1", "dev", ChannelKind::Open, 1));
        store.upsert(channel("c2", "t2", "ops", ChannelKind::Open, 1));
        let removed = store.remove_team_channels(&TeamId::from("t1"));
        assert_eq!(removed, vec![ChannelId::from("c1")]);
        assert!(store.get(&ChannelId::from("c1")).is_none());
        assert!(store.get(&ChannelId::from("c2")).is_some());
    }
}
