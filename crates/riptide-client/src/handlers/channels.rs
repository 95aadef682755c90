//! Channel lifecycle and membership events.

use tracing::debug;

use riptide_shared::models::{Channel, ChannelMember};
use riptide_shared::types::{ChannelId, TeamId, UserId};

use crate::dispatch::Reconciler;
use crate::events::UiEvent;

use super::{fetch_channel_and_membership, redirect_after_channel_loss, refresh_channel_stats};

pub(crate) async fn handle_channel_created(
    rc: &Reconciler,
    channel_id: ChannelId,
    team_id: Option<TeamId>,
) {
    let wanted = rc
        .with_session(|s| {
            let on_team = team_id.map_or(true, |t| Some(t) == s.current_team_id);
            on_team && s.store.channels.get(&channel_id).is_none()
        })
        .unwrap_or(false);
    if wanted {
        fetch_channel_and_membership(rc, &channel_id).await;
    }
}

pub(crate) fn handle_channel_updated(rc: &Reconciler, channel: Channel) {
    rc.with_session(|s| s.store.channels.upsert(channel));
}

pub(crate) async fn handle_channel_deleted(
    rc: &Reconciler,
    channel_id: ChannelId,
    _team_id: Option<TeamId>,
    delete_at: i64,
) {
    rc.with_session(|s| {
        s.store.channels.mark_deleted(&channel_id, delete_at);
        s.store.posts.evict_channel(&channel_id);
    });
    redirect_after_channel_loss(rc, &channel_id);
}

pub(crate) fn handle_channel_converted(rc: &Reconciler, channel_id: ChannelId) {
    rc.with_session(|s| s.store.channels.convert_to_private(&channel_id));
}

pub(crate) fn handle_channel_member_updated(rc: &Reconciler, member: ChannelMember) {
    rc.with_session(|s| {
        if s.is_me(&member.user_id) {
            s.store.channels.upsert_my_member(member);
        }
    });
}

pub(crate) async fn handle_direct_added(rc: &Reconciler, channel_id: ChannelId) {
    fetch_channel_and_membership(rc, &channel_id).await;
}

pub(crate) async fn handle_user_added(
    rc: &Reconciler,
    user_id: UserId,
    team_id: Option<TeamId>,
    channel_id: Option<ChannelId>,
) {
    let Some(channel_id) = channel_id else {
        debug!(user = %user_id, "user_added without channel");
        return;
    };

    let (viewing, me_joined) = rc
        .with_session(|s| {
            s.store.channels.add_member(&channel_id, user_id.clone());
            let on_team = team_id.map_or(true, |t| Some(t) == s.current_team_id);
            (s.viewing(&channel_id), s.is_me(&user_id) && on_team)
        })
        .unwrap_or((false, false));

    if viewing {
        refresh_channel_stats(rc, &channel_id).await;
    }
    if me_joined {
        fetch_channel_and_membership(rc, &channel_id).await;
    }
}

pub(crate) async fn handle_user_removed(
    rc: &Reconciler,
    user_id: Option<UserId>,
    channel_id: Option<ChannelId>,
    remover_id: Option<UserId>,
) {
    let Some(channel_id) = channel_id else {
        debug!("user_removed without channel");
        return;
    };

    let me = rc
        .with_session(|s| user_id.as_ref().is_some_and(|u| s.is_me(u)))
        .unwrap_or(false);

    if me {
        debug!(channel = %channel_id, remover = ?remover_id, "removed from channel");
        let viewing = rc
            .with_session(|s| {
                let viewing = s.viewing(&channel_id);
                s.store.channels.leave(&channel_id);
                s.store.posts.evict_channel(&channel_id);
                viewing
            })
            .unwrap_or(false);
        if viewing {
            rc.ui.emit(UiEvent::RemovedFromChannel {
                channel_id: channel_id.clone(),
            });
            redirect_after_channel_loss(rc, &channel_id);
        }
        return;
    }

    if let Some(user_id) = user_id {
        let viewing = rc
            .with_session(|s| {
                s.store.channels.remove_member(&channel_id, &user_id);
                s.viewing(&channel_id)
            })
            .unwrap_or(false);
        if viewing {
            refresh_channel_stats(rc, &channel_id).await;
        }
    }
}
