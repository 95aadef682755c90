//! Types shared between the transport, store and reconciliation layers.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use models::{
    Channel, ChannelKind, ChannelMember, ChannelStats, Post, Preference, Reaction, Status, Team,
    User, UserStatus,
};
pub use protocol::{Broadcast, EventEnvelope, InboundFrame, ServerEvent};
pub use types::{ChannelId, PostId, TeamId, UserId};
