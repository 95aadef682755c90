//! Notifications surfaced to whatever front end sits on top of the
//! reconciliation layer. Cache writes are silent; only things that need
//! a visible response show up here.

use tokio::sync::broadcast;

use riptide_shared::types::{ChannelId, PostId, TeamId, UserId};

#[derive(Debug, Clone)]
pub enum UiEvent {
    /// A new post landed in the cache.
    NewPost {
        channel_id: ChannelId,
        post_id: PostId,
    },
    Typing {
        channel_id: ChannelId,
        user_id: UserId,
    },
    /// The current user was removed from a channel they were viewing.
    RemovedFromChannel { channel_id: ChannelId },
    /// The view should move to another channel, e.g. after the current
    /// one was archived.
    NavigateToChannel {
        team_id: TeamId,
        channel_id: ChannelId,
    },
    /// No sensible channel remains; go to the landing view.
    NavigateHome,
    /// Show or clear the persistent connectivity error.
    ConnectivityBanner { visible: bool },
}

/// Fan-out sender for [`UiEvent`]s. Emitting never blocks and never
/// fails; with no subscribers events are simply dropped.
#[derive(Debug, Clone)]
pub struct UiSender(broadcast::Sender<UiEvent>);

impl UiSender {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<UiEvent>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self(tx), rx)
    }

    pub fn emit(&self, event: UiEvent) {
        let _ = self.0.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.0.subscribe()
    }
}
