//! Profile, presence and typing events.

use tracing::debug;

use riptide_shared::models::{User, UserStatus};
use riptide_shared::types::{ChannelId, PostId, UserId};

use crate::dispatch::Reconciler;
use crate::events::UiEvent;

pub(crate) fn handle_user_updated(rc: &Reconciler, user: User) {
    rc.with_session(|s| s.store.users.upsert(user));
}

pub(crate) fn handle_status_changed(rc: &Reconciler, user_id: UserId, status: UserStatus) {
    rc.with_session(|s| s.store.users.set_status(user_id, status));
}

pub(crate) async fn handle_typing(
    rc: &Reconciler,
    channel_id: Option<ChannelId>,
    user_id: UserId,
    _parent_id: Option<PostId>,
) {
    let Some(channel_id) = channel_id else {
        return;
    };

    // Make sure the typing user can be named in the UI.
    let profile_known = rc
        .with_session(|s| s.store.users.get(&user_id).is_some())
        .unwrap_or(true);
    if !profile_known {
        match rc.api.user(&user_id).await {
            Ok(user) => {
                rc.with_session(|s| s.store.users.upsert(user));
            }
            Err(err) => {
                debug!(user = %user_id, error = %err, "profile fetch failed");
            }
        }
    }

    rc.ui.emit(UiEvent::Typing {
        channel_id,
        user_id,
    });
}
