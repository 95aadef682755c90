//! Post cache: posts by ID plus a per-channel timeline index ordered by
//! `create_at`, and reactions keyed by post.

use std::collections::HashMap;

use tracing::debug;

use riptide_shared::models::{Post, Reaction};
use riptide_shared::types::{ChannelId, PostId};

#[derive(Debug, Default)]
pub struct PostStore {
    posts: HashMap<PostId, Post>,
    /// Timeline per channel, post IDs ordered by `create_at` ascending.
    by_channel: HashMap<ChannelId, Vec<PostId>>,
    reactions: HashMap<PostId, Vec<Reaction>>,
}

impl PostStore {
    /// Insert or replace a post. Replays and out-of-order edits are
    /// resolved by `update_at`; a record no newer than the cached one is
    /// a no-op. Returns whether the write was applied.
    pub fn upsert(&mut self, post: Post) -> bool {
        if let Some(existing) = self.posts.get(&post.id) {
            if existing.update_at >= post.update_at {
                debug!(post = %post.id, "ignoring stale post update");
                return false;
            }
        }

        let timeline = self.by_channel.entry(post.channel_id.clone()).or_default();
        if !timeline.contains(&post.id) {
            let posts = &self.posts;
            let create_at = post.create_at;
            let idx = timeline
                .partition_point(|id| posts.get(id).map_or(0, |p| p.create_at) <= create_at);
            timeline.insert(idx, post.id.clone());
        }
        self.posts.insert(post.id.clone(), post);
        true
    }

    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.get(id)
    }

    pub fn remove(&mut self, id: &PostId) {
        if let Some(post) = self.posts.remove(id) {
            if let Some(timeline) = self.by_channel.get_mut(&post.channel_id) {
                timeline.retain(|p| p != id);
            }
        }
        self.reactions.remove(id);
    }

    /// Posts of one channel, oldest first.
    pub fn channel_posts(&self, channel_id: &ChannelId) -> Vec<&Post> {
        self.by_channel
            .get(channel_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.posts.get(id))
            .collect()
    }

    pub fn most_recent_in_channel(&self, channel_id: &ChannelId) -> Option<&Post> {
        self.by_channel
            .get(channel_id)?
            .last()
            .and_then(|id| self.posts.get(id))
    }

    /// Drop everything cached for one channel.
    pub fn evict_channel(&mut self, channel_id: &ChannelId) {
        if let Some(timeline) = self.by_channel.remove(channel_id) {
            for id in timeline {
                self.posts.remove(&id);
                self.reactions.remove(&id);
            }
        }
    }

    // -- reactions ---------------------------------------------------------

    pub fn add_reaction(&mut self, reaction: Reaction) {
        let list = self.reactions.entry(reaction.post_id.clone()).or_default();
        list.retain(|r| !(r.user_id == reaction.user_id && r.emoji_name == reaction.emoji_name));
        list.push(reaction);
    }

    pub fn remove_reaction(&mut self, reaction: &Reaction) {
        if let Some(list) = self.reactions.get_mut(&reaction.post_id) {
            list.retain(|r| {
                !(r.user_id == reaction.user_id && r.emoji_name == reaction.emoji_name)
            });
        }
    }

    pub fn reactions(&self, post_id: &PostId) -> &[Reaction] {
        self.reactions.get(post_id).map_or(&[], Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.posts.clear();
        self.by_channel.clear();
        self.reactions.clear();
    }
}
