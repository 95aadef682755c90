//! Event dispatch and cache reconciliation.
//!
//! The [`Reconciler`] sits between the socket task and the store: every
//! inbound push is decoded once, routed to exactly one handler, and
//! folded into the cache. Lost connectivity and sequence gaps degrade to
//! re-fetching authoritative state over REST, so the cache converges even
//! when pushes are missed.
//!
//! The session lock is never held across an await.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::{debug, info, warn};

use riptide_net::{SocketCommand, SocketNotification};
use riptide_shared::protocol::{EventEnvelope, ServerEvent};
use riptide_shared::types::{ChannelId, PostId};

use crate::api::ServerApi;
use crate::error::ApiError;
use crate::events::{UiEvent, UiSender};
use crate::handlers;
use crate::state::Session;

#[derive(Clone)]
pub struct Reconciler {
    session: Arc<Mutex<Session>>,
    pub(crate) api: Arc<dyn ServerApi>,
    pub(crate) ui: UiSender,
}

impl Reconciler {
    pub fn new(session: Arc<Mutex<Session>>, api: Arc<dyn ServerApi>, ui: UiSender) -> Self {
        Self { session, api, ui }
    }

    /// Run a closure against the locked session. Returns `None` only if
    /// the lock is poisoned, which is logged and otherwise swallowed.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        match self.session.lock() {
            Ok(mut guard) => Some(f(&mut guard)),
            Err(_) => {
                warn!("session lock poisoned");
                None
            }
        }
    }

    // -- socket lifecycle --------------------------------------------------

    pub async fn handle_notification(&self, notification: SocketNotification) {
        match notification {
            SocketNotification::FirstConnect => {
                info!("realtime connection established");
                self.on_connected().await;
            }
            SocketNotification::Reconnected => {
                info!("realtime connection restored");
                self.on_connected().await;
            }
            SocketNotification::MissedEvents => {
                warn!("missed pushed events, re-fetching state");
                self.resync_full().await;
            }
            SocketNotification::Closed {
                consecutive_failures,
            } => {
                debug!(consecutive_failures, "realtime connection lost");
                let surfaced = self
                    .with_session(|s| s.record_socket_failure(consecutive_failures))
                    .unwrap_or(false);
                if surfaced {
                    self.ui.emit(UiEvent::ConnectivityBanner { visible: true });
                }
            }
            SocketNotification::Message(envelope) => self.handle_envelope(&envelope).await,
        }
    }

    async fn on_connected(&self) {
        let cleared = self
            .with_session(|s| s.record_socket_success())
            .unwrap_or(false);
        if cleared {
            self.ui.emit(UiEvent::ConnectivityBanner { visible: false });
        }
        self.resync().await;
    }

    // -- event dispatch ----------------------------------------------------

    pub async fn handle_envelope(&self, envelope: &EventEnvelope) {
        match ServerEvent::decode(envelope) {
            Ok(event) => self.handle_event(event).await,
            Err(err) => {
                warn!(event = %envelope.event, error = %err, "dropping malformed event");
            }
        }
    }

    /// Route one decoded event to its handler.
    pub async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Hello {
                server_version,
                connection_id,
            } => self.handle_hello(server_version, connection_id).await,

            ServerEvent::Posted { post, set_online } => {
                handlers::posts::handle_posted(self, post, set_online).await
            }
            ServerEvent::PostEdited { post } => {
                handlers::posts::handle_post_edited(self, post).await
            }
            ServerEvent::PostDeleted { post } => {
                handlers::posts::handle_post_deleted(self, post).await
            }
            ServerEvent::PostUnread {
                channel_id,
                last_viewed_at,
                msg_count,
                mention_count,
            } => handlers::posts::handle_post_unread(
                self,
                channel_id,
                last_viewed_at,
                msg_count,
                mention_count,
            ),
            ServerEvent::ReactionAdded { reaction } => {
                handlers::posts::handle_reaction_added(self, reaction)
            }
            ServerEvent::ReactionRemoved { reaction } => {
                handlers::posts::handle_reaction_removed(self, reaction)
            }

            ServerEvent::ChannelCreated {
                channel_id,
                team_id,
            } => handlers::channels::handle_channel_created(self, channel_id, team_id).await,
            ServerEvent::ChannelUpdated { channel } => {
                handlers::channels::handle_channel_updated(self, channel)
            }
            ServerEvent::ChannelDeleted {
                channel_id,
                team_id,
                delete_at,
            } => {
                handlers::channels::handle_channel_deleted(self, channel_id, team_id, delete_at)
                    .await
            }
            ServerEvent::ChannelConverted { channel_id } => {
                handlers::channels::handle_channel_converted(self, channel_id)
            }
            ServerEvent::ChannelMemberUpdated { member } => {
                handlers::channels::handle_channel_member_updated(self, member)
            }
            ServerEvent::DirectAdded { channel_id } => {
                handlers::channels::handle_direct_added(self, channel_id).await
            }
            ServerEvent::UserAdded {
                user_id,
                team_id,
                channel_id,
            } => handlers::channels::handle_user_added(self, user_id, team_id, channel_id).await,
            ServerEvent::UserRemoved {
                user_id,
                channel_id,
                remover_id,
            } => {
                handlers::channels::handle_user_removed(self, user_id, channel_id, remover_id)
                    .await
            }

            ServerEvent::UserUpdated { user } => handlers::users::handle_user_updated(self, user),
            ServerEvent::StatusChanged { user_id, status } => {
                handlers::users::handle_status_changed(self, user_id, status)
            }
            ServerEvent::Typing {
                channel_id,
                user_id,
                parent_id,
            } => handlers::users::handle_typing(self, channel_id, user_id, parent_id).await,

            ServerEvent::AddedToTeam { team_id, user_id } => {
                handlers::teams::handle_added_to_team(self, team_id, user_id).await
            }
            ServerEvent::LeaveTeam { team_id, user_id } => {
                handlers::teams::handle_leave_team(self, team_id, user_id).await
            }
            ServerEvent::TeamUpdated { team } => handlers::teams::handle_team_updated(self, team),
            ServerEvent::TeamDeleted { team } => {
                handlers::teams::handle_team_deleted(self, team).await
            }

            ServerEvent::PreferenceChanged { preference } => {
                handlers::preferences::handle_preference_changed(self, preference)
            }
            ServerEvent::PreferencesChanged { preferences } => {
                handlers::preferences::handle_preferences_changed(self, preferences)
            }
            ServerEvent::PreferencesDeleted { preferences } => {
                handlers::preferences::handle_preferences_deleted(self, preferences)
            }

            ServerEvent::Unknown { event } => {
                debug!(event, "ignoring unknown event");
            }
        }
    }

    async fn handle_hello(&self, server_version: String, connection_id: Option<String>) {
        info!(version = %server_version, "server hello");
        let version_changed = self
            .with_session(|s| {
                let changed = s
                    .server_version
                    .as_deref()
                    .is_some_and(|v| v != server_version);
                s.server_version = Some(server_version);
                s.connection_id = connection_id;
                changed
            })
            .unwrap_or(false);
        // A new server build can mean new feature flags.
        if version_changed {
            self.refresh_client_config().await;
        }
    }

    // -- reconciliation ----------------------------------------------------

    /// Re-fetch authoritative state: channels and memberships of the
    /// current team, posts of the viewed channel, presence of every
    /// cached profile.
    pub async fn resync(&self) {
        if let Err(err) = self.try_resync().await {
            warn!(error = %err, "resync failed");
        }
    }

    /// [`Reconciler::resync`] plus a client config refresh, for the cases
    /// where the server may have changed underneath us.
    pub async fn resync_full(&self) {
        self.resync().await;
        self.refresh_client_config().await;
    }

    async fn try_resync(&self) -> Result<(), ApiError> {
        let Some((team_id, viewed)) = self.with_session(|s| {
            (s.current_team_id.clone(), s.current_channel_id.clone())
        }) else {
            return Ok(());
        };

        if let Some(team_id) = team_id {
            let channels = self.api.my_channels(&team_id).await?;
            let members = self.api.my_channel_members(&team_id).await?;
            self.with_session(|s| {
                for channel in channels {
                    s.store.channels.upsert(channel);
                }
                for member in members {
                    s.store.channels.upsert_my_member(member);
                }
            });
        }

        if let Some(channel_id) = viewed {
            let since = self
                .with_session(|s| {
                    s.store
                        .posts
                        .most_recent_in_channel(&channel_id)
                        .map(|p| p.create_at)
                })
                .flatten();
            let posts = match since {
                Some(since) => self.api.posts_since(&channel_id, since).await?,
                None => self.api.posts(&channel_id).await?,
            };
            self.with_session(|s| {
                for post in posts {
                    s.store.posts.upsert(post);
                }
            });
        }

        let profile_ids = self
            .with_session(|s| s.store.users.profile_ids())
            .unwrap_or_default();
        if !profile_ids.is_empty() {
            let statuses = self.api.statuses_by_ids(&profile_ids).await?;
            self.with_session(|s| s.store.users.set_statuses(statuses));
        }

        Ok(())
    }

    async fn refresh_client_config(&self) {
        match self.api.client_config().await {
            Ok(config) => {
                self.with_session(|s| s.client_config = config);
            }
            Err(err) => warn!(error = %err, "client config refresh failed"),
        }
    }

    // -- outbound actions --------------------------------------------------

    /// Tell the channel's other members that we are typing.
    pub async fn send_typing(&self, channel_id: &ChannelId, parent_id: Option<&PostId>) {
        let Some(tx) = self.with_session(|s| s.socket_tx.clone()).flatten() else {
            return;
        };
        let data = json!({
            "channel_id": channel_id,
            "parent_id": parent_id.map(PostId::as_str).unwrap_or(""),
        });
        if tx
            .send(SocketCommand::SendAction {
                action: "user_typing".to_string(),
                data,
            })
            .await
            .is_err()
        {
            debug!("socket task gone, typing action dropped");
        }
    }
}
