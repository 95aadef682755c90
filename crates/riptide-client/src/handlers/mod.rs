//! Per-domain event handlers. Each takes the [`Reconciler`] for store
//! access, follow-up fetches and UI notifications.

pub(crate) mod channels;
pub(crate) mod posts;
pub(crate) mod preferences;
pub(crate) mod teams;
pub(crate) mod users;

use tracing::{debug, warn};

use riptide_shared::types::ChannelId;

use crate::dispatch::Reconciler;
use crate::events::UiEvent;

/// Fetch a channel we learned about from a push, plus our membership in
/// it if any.
pub(crate) async fn fetch_channel_and_membership(rc: &Reconciler, channel_id: &ChannelId) {
    match rc.api.channel(channel_id).await {
        Ok(channel) => {
            rc.with_session(|s| s.store.channels.upsert(channel));
        }
        Err(err) => {
            warn!(channel = %channel_id, error = %err, "channel fetch failed");
            return;
        }
    }
    match rc.api.my_channel_member(channel_id).await {
        Ok(member) => {
            rc.with_session(|s| s.store.channels.upsert_my_member(member));
        }
        Err(err) => {
            debug!(channel = %channel_id, error = %err, "no membership for channel");
        }
    }
}

/// Member counts are fetched, never derived from pushes.
pub(crate) async fn refresh_channel_stats(rc: &Reconciler, channel_id: &ChannelId) {
    match rc.api.channel_stats(channel_id).await {
        Ok(stats) => {
            rc.with_session(|s| s.store.channels.set_stats(stats));
        }
        Err(err) => warn!(channel = %channel_id, error = %err, "stats refresh failed"),
    }
}

/// Move the user off a channel that went away. Prefers the current
/// team's default channel; with nowhere to go, falls back to the landing
/// view. Does nothing when the user was not viewing the channel.
pub(crate) fn redirect_after_channel_loss(rc: &Reconciler, channel_id: &ChannelId) {
    let destination = rc
        .with_session(|s| {
            if !s.viewing(channel_id) {
                return None;
            }
            let team_id = s.current_team_id.clone();
            let target = team_id.as_ref().and_then(|t| {
                s.store
                    .channels
                    .default_channel_for_team(t)
                    .map(|c| c.id.clone())
            });
            match (team_id, target) {
                (Some(team_id), Some(target)) if &target != channel_id => {
                    s.current_channel_id = Some(target.clone());
                    Some(UiEvent::NavigateToChannel {
                        team_id,
                        channel_id: target,
                    })
                }
                _ => {
                    s.current_channel_id = None;
                    Some(UiEvent::NavigateHome)
                }
            }
        })
        .flatten();
    if let Some(event) = destination {
        rc.ui.emit(event);
    }
}
