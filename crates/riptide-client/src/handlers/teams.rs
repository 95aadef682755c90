//! Team membership and lifecycle events.

use tracing::{debug, warn};

use riptide_shared::models::Team;
use riptide_shared::types::{TeamId, UserId};

use crate::dispatch::Reconciler;
use crate::events::UiEvent;

pub(crate) async fn handle_added_to_team(
    rc: &Reconciler,
    team_id: TeamId,
    user_id: Option<UserId>,
) {
    let relevant = rc
        .with_session(|s| user_id.as_ref().map_or(true, |u| s.is_me(u)))
        .unwrap_or(false);
    if !relevant {
        return;
    }
    match rc.api.team(&team_id).await {
        Ok(team) => {
            rc.with_session(|s| {
                s.store.teams.upsert(team);
                s.store.teams.join(team_id.clone());
            });
        }
        Err(err) => warn!(team = %team_id, error = %err, "team fetch failed"),
    }
}

pub(crate) async fn handle_leave_team(rc: &Reconciler, team_id: TeamId, user_id: UserId) {
    let me = rc.with_session(|s| s.is_me(&user_id)).unwrap_or(false);
    if !me {
        debug!(team = %team_id, user = %user_id, "other user left team");
        return;
    }
    leave_and_relocate(rc, &team_id, false).await;
}

pub(crate) fn handle_team_updated(rc: &Reconciler, team: Team) {
    rc.with_session(|s| s.store.teams.upsert(team));
}

pub(crate) async fn handle_team_deleted(rc: &Reconciler, team: Team) {
    let mine = rc
        .with_session(|s| s.store.teams.is_mine(&team.id))
        .unwrap_or(false);
    if mine {
        leave_and_relocate(rc, &team.id, true).await;
    } else {
        rc.with_session(|s| s.store.teams.remove(&team.id));
    }
}

/// Drop a team's membership and cached channels. When it was the current
/// team, relocate the user to another joined team's default channel, or
/// the landing view when none remains.
async fn leave_and_relocate(rc: &Reconciler, team_id: &TeamId, forget_team: bool) {
    let destination = rc
        .with_session(|s| {
            s.store.teams.leave(team_id);
            let removed = s.store.channels.remove_team_channels(team_id);
            for id in &removed {
                s.store.posts.evict_channel(id);
            }
            if forget_team {
                s.store.teams.remove(team_id);
            }

            if s.current_team_id.as_ref() != Some(team_id) {
                return None;
            }

            let next_team = s
                .store
                .teams
                .other_joined_team(team_id)
                .map(|t| t.id.clone());
            match next_team {
                Some(next_team) => {
                    let next_channel = s
                        .store
                        .channels
                        .default_channel_for_team(&next_team)
                        .map(|c| c.id.clone());
                    s.current_team_id = Some(next_team.clone());
                    s.current_channel_id = next_channel.clone();
                    match next_channel {
                        Some(channel_id) => Some(UiEvent::NavigateToChannel {
                            team_id: next_team,
                            channel_id,
                        }),
                        // The other team's channels are not cached yet;
                        // the resync below will pull them in.
                        None => Some(UiEvent::NavigateHome),
                    }
                }
                None => {
                    s.current_team_id = None;
                    s.current_channel_id = None;
                    Some(UiEvent::NavigateHome)
                }
            }
        })
        .flatten();

    if let Some(event) = destination {
        rc.ui.emit(event);
        rc.resync().await;
    }
}
