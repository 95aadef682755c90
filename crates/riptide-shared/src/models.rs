//! Server-owned entity models mirrored in the client cache.
//!
//! Every struct derives `Serialize` and `Deserialize`: the same shapes
//! arrive over the websocket (sometimes as a nested JSON string, see
//! [`crate::protocol`]) and from the REST API. All timestamps are epoch
//! milliseconds as reported by the server.

use serde::{Deserialize, Serialize};

use crate::types::{empty_id_as_none, ChannelId, PostId, TeamId, UserId};

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A single message posted in a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// Root of the reply thread this post belongs to, if any.
    #[serde(default, deserialize_with = "empty_id_as_none")]
    pub root_id: Option<PostId>,
    #[serde(default)]
    pub message: String,
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
    /// Non-zero once the post has been deleted on the server.
    #[serde(default)]
    pub delete_at: i64,
    #[serde(default)]
    pub is_pinned: bool,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Channel type discriminator as sent by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelKind {
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "P")]
    Private,
    #[serde(rename = "D")]
    Direct,
    #[serde(rename = "G")]
    Group,
}

/// A conversation channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    /// Direct and group channels carry no team; the server sends `""`.
    #[serde(default, deserialize_with = "empty_id_as_none")]
    pub team_id: Option<TeamId>,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// URL slug, unique per team.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub update_at: i64,
    /// Non-zero once the channel has been archived.
    #[serde(default)]
    pub delete_at: i64,
}

/// The requesting user's membership in one channel, including unread state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelMember {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    #[serde(default)]
    pub roles: String,
    #[serde(default)]
    pub last_viewed_at: i64,
    #[serde(default)]
    pub msg_count: i64,
    #[serde(default)]
    pub mention_count: i64,
}

/// Aggregate counts for a channel, fetched rather than trusted from pushes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelStats {
    pub channel_id: ChannelId,
    #[serde(default)]
    pub member_count: i64,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub roles: String,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default)]
    pub delete_at: i64,
}

/// Presence state, always lowercase on the wire.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Away,
    Dnd,
    #[default]
    Offline,
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserStatus::Online => "online",
            UserStatus::Away => "away",
            UserStatus::Dnd => "dnd",
            UserStatus::Offline => "offline",
        };
        write!(f, "{s}")
    }
}

/// One user's presence as returned by the bulk status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub user_id: UserId,
    pub status: UserStatus,
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// A team groups channels and members.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    /// URL slug.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub update_at: i64,
    #[serde(default)]
    pub delete_at: i64,
}

// ---------------------------------------------------------------------------
// Preference / Reaction
// ---------------------------------------------------------------------------

/// A single user preference entry, keyed by (category, name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preference {
    pub user_id: UserId,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// An emoji reaction attached to a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub user_id: UserId,
    pub post_id: PostId,
    pub emoji_name: String,
    #[serde(default)]
    pub create_at: i64,
}
