//! Wire protocol for the server's realtime push channel.
//!
//! Every push arrives as an [`EventEnvelope`] — `{event, data, broadcast,
//! seq}` — where several `data` fields are themselves JSON-encoded strings
//! requiring a second decode pass. That second pass happens exactly once,
//! here, turning the envelope into the [`ServerEvent`] sum type the
//! dispatcher consumes; handlers never re-parse payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::models::{
    Channel, ChannelMember, Post, Preference, Reaction, Team, User, UserStatus,
};
use crate::types::{empty_id_as_none, ChannelId, PostId, TeamId, UserId};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Routing hints attached to every push event. The server sends empty
/// strings for fields that do not apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Broadcast {
    #[serde(default, deserialize_with = "empty_id_as_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(default, deserialize_with = "empty_id_as_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, deserialize_with = "empty_id_as_none")]
    pub user_id: Option<UserId>,
}

/// A raw push event as read off the socket.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub broadcast: Broadcast,
    /// Server-side sequence number, consecutive per connection.
    #[serde(default)]
    pub seq: i64,
}

/// Anything the server writes on the socket: a push event, or the
/// acknowledgement of an action we sent (matched by `seq_reply`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Event(EventEnvelope),
    Reply {
        #[serde(default)]
        status: String,
        seq_reply: i64,
    },
}

// ---------------------------------------------------------------------------
// Decoded events
// ---------------------------------------------------------------------------

/// A fully decoded push event, one payload shape per tag.
///
/// Unrecognized tags decode to [`ServerEvent::Unknown`] so the dispatcher
/// can drop them silently; a recognized tag with a malformed payload is a
/// [`ProtocolError`] instead.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// First event on every connection; carries the server build and the
    /// ID assigned to this connection.
    Hello {
        server_version: String,
        connection_id: Option<String>,
    },
    Posted {
        post: Post,
        /// Whether the sender may be presumed online because of this post.
        set_online: bool,
    },
    PostEdited {
        post: Post,
    },
    PostDeleted {
        post: Post,
    },
    PostUnread {
        channel_id: ChannelId,
        last_viewed_at: i64,
        msg_count: i64,
        mention_count: i64,
    },
    ChannelCreated {
        channel_id: ChannelId,
        team_id: Option<TeamId>,
    },
    ChannelUpdated {
        channel: Channel,
    },
    ChannelDeleted {
        channel_id: ChannelId,
        team_id: Option<TeamId>,
        delete_at: i64,
    },
    ChannelConverted {
        channel_id: ChannelId,
    },
    ChannelMemberUpdated {
        member: ChannelMember,
    },
    DirectAdded {
        channel_id: ChannelId,
    },
    UserAdded {
        user_id: UserId,
        team_id: Option<TeamId>,
        channel_id: Option<ChannelId>,
    },
    UserRemoved {
        user_id: Option<UserId>,
        channel_id: Option<ChannelId>,
        remover_id: Option<UserId>,
    },
    UserUpdated {
        user: User,
    },
    AddedToTeam {
        team_id: TeamId,
        user_id: Option<UserId>,
    },
    LeaveTeam {
        team_id: TeamId,
        user_id: UserId,
    },
    TeamUpdated {
        team: Team,
    },
    TeamDeleted {
        team: Team,
    },
    PreferenceChanged {
        preference: Preference,
    },
    PreferencesChanged {
        preferences: Vec<Preference>,
    },
    PreferencesDeleted {
        preferences: Vec<Preference>,
    },
    StatusChanged {
        user_id: UserId,
        status: UserStatus,
    },
    Typing {
        channel_id: Option<ChannelId>,
        user_id: UserId,
        parent_id: Option<PostId>,
    },
    ReactionAdded {
        reaction: Reaction,
    },
    ReactionRemoved {
        reaction: Reaction,
    },
    /// Event tag not in the dispatch table; dropped by the dispatcher.
    Unknown {
        event: String,
    },
}

impl ServerEvent {
    /// Decode an envelope into a typed event.
    ///
    /// This is the single place nested JSON-string payloads are parsed.
    pub fn decode(envelope: &EventEnvelope) -> Result<Self, ProtocolError> {
        let ev = envelope.event.as_str();
        let data = &envelope.data;
        let broadcast = &envelope.broadcast;

        let event = match ev {
            "hello" => ServerEvent::Hello {
                server_version: field(ev, data, "server_version")?,
                connection_id: opt_field(data, "connection_id"),
            },
            "posted" | "ephemeral_message" => ServerEvent::Posted {
                post: nested(ev, data, "post")?,
                set_online: data
                    .get("set_online")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            "post_edited" => ServerEvent::PostEdited {
                post: nested(ev, data, "post")?,
            },
            "post_deleted" => ServerEvent::PostDeleted {
                post: nested(ev, data, "post")?,
            },
            "post_unread" => ServerEvent::PostUnread {
                channel_id: broadcast.channel_id.clone().ok_or(missing(ev, "channel_id"))?,
                last_viewed_at: int_field(data, "last_viewed_at"),
                msg_count: int_field(data, "msg_count"),
                mention_count: int_field(data, "mention_count"),
            },
            "channel_created" => ServerEvent::ChannelCreated {
                channel_id: field(ev, data, "channel_id")?,
                team_id: opt_field(data, "team_id"),
            },
            "channel_updated" => ServerEvent::ChannelUpdated {
                channel: nested(ev, data, "channel")?,
            },
            "channel_deleted" => ServerEvent::ChannelDeleted {
                channel_id: field(ev, data, "channel_id")?,
                team_id: broadcast.team_id.clone(),
                delete_at: int_field(data, "delete_at"),
            },
            "channel_converted" => ServerEvent::ChannelConverted {
                channel_id: field(ev, data, "channel_id")?,
            },
            "channel_member_updated" => ServerEvent::ChannelMemberUpdated {
                member: nested(ev, data, "channelMember")?,
            },
            "direct_added" | "group_added" => ServerEvent::DirectAdded {
                channel_id: broadcast
                    .channel_id
                    .clone()
                    .ok_or(missing(ev, "channel_id"))?,
            },
            "user_added" => ServerEvent::UserAdded {
                user_id: field(ev, data, "user_id")?,
                team_id: opt_field(data, "team_id"),
                channel_id: broadcast.channel_id.clone(),
            },
            "user_removed" => ServerEvent::UserRemoved {
                user_id: broadcast
                    .user_id
                    .clone()
                    .or_else(|| opt_field(data, "user_id")),
                channel_id: opt_field::<ChannelId>(data, "channel_id")
                    .or_else(|| broadcast.channel_id.clone()),
                remover_id: opt_field(data, "remover_id"),
            },
            "user_updated" => ServerEvent::UserUpdated {
                user: nested(ev, data, "user")?,
            },
            "added_to_team" => ServerEvent::AddedToTeam {
                team_id: field(ev, data, "team_id")?,
                user_id: opt_field(data, "user_id"),
            },
            "leave_team" => ServerEvent::LeaveTeam {
                team_id: field(ev, data, "team_id")?,
                user_id: field(ev, data, "user_id")?,
            },
            "update_team" => ServerEvent::TeamUpdated {
                team: nested(ev, data, "team")?,
            },
            "delete_team" => ServerEvent::TeamDeleted {
                team: nested(ev, data, "team")?,
            },
            "preference_changed" => ServerEvent::PreferenceChanged {
                preference: nested(ev, data, "preference")?,
            },
            "preferences_changed" => ServerEvent::PreferencesChanged {
                preferences: nested(ev, data, "preferences")?,
            },
            "preferences_deleted" => ServerEvent::PreferencesDeleted {
                preferences: nested(ev, data, "preferences")?,
            },
            "status_change" => ServerEvent::StatusChanged {
                user_id: field(ev, data, "user_id")?,
                status: field(ev, data, "status")?,
            },
            "typing" => ServerEvent::Typing {
                channel_id: broadcast.channel_id.clone(),
                user_id: field(ev, data, "user_id")?,
                parent_id: opt_field(data, "parent_id"),
            },
            "reaction_added" => ServerEvent::ReactionAdded {
                reaction: nested(ev, data, "reaction")?,
            },
            "reaction_removed" => ServerEvent::ReactionRemoved {
                reaction: nested(ev, data, "reaction")?,
            },
            other => ServerEvent::Unknown {
                event: other.to_string(),
            },
        };

        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn missing(event: &str, field: &'static str) -> ProtocolError {
    ProtocolError::MissingField {
        event: event.to_string(),
        field,
    }
}

/// Decode `data[field]`, accepting either an inline value or a
/// JSON-encoded string (the double-encoded payloads of the wire format).
fn nested<T: DeserializeOwned>(
    event: &str,
    data: &Value,
    field: &'static str,
) -> Result<T, ProtocolError> {
    let value = data.get(field).ok_or(missing(event, field))?;
    let result = match value {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    result.map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// Decode a required plain field of `data`.
fn field<T: DeserializeOwned>(
    event: &str,
    data: &Value,
    field: &'static str,
) -> Result<T, ProtocolError> {
    let value = data.get(field).ok_or(missing(event, field))?;
    serde_json::from_value(value.clone()).map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// Decode an optional plain field; absent, null and empty-string all map
/// to `None`.
fn opt_field<T: DeserializeOwned>(data: &Value, field: &str) -> Option<T> {
    let value = data.get(field)?;
    if matches!(value, Value::String(s) if s.is_empty()) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// Decode an integer field, tolerating absence.
fn int_field(data: &Value, field: &str) -> i64 {
    data.get(field).and_then(Value::as_i64).unwrap_or(0)
}
