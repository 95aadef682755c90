//! End-to-end reconciliation scenarios driven through the dispatcher
//! with a recording in-memory API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use riptide_client::{ApiError, Reconciler, ServerApi, Session, UiEvent, UiSender};
use riptide_net::SocketNotification;
use riptide_shared::constants::{DEFAULT_CHANNEL_NAME, MAX_SOCKET_FAILS};
use riptide_shared::models::{
    Channel, ChannelKind, ChannelMember, ChannelStats, Post, Status, Team, User,
};
use riptide_shared::protocol::{EventEnvelope, ServerEvent};
use riptide_shared::types::{ChannelId, PostId, TeamId, UserId};

// ---------------------------------------------------------------------------
// Mock API
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockApi {
    calls: Mutex<Vec<String>>,
    channels: Mutex<HashMap<String, Channel>>,
    members: Mutex<HashMap<String, ChannelMember>>,
    teams: Mutex<HashMap<String, Team>>,
    users: Mutex<HashMap<String, User>>,
}

impl MockApi {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn put_channel(&self, channel: Channel, member: Option<ChannelMember>) {
        if let Some(member) = member {
            self.members
                .lock()
                .unwrap()
                .insert(channel.id.as_str().to_string(), member);
        }
        self.channels
            .lock()
            .unwrap()
            .insert(channel.id.as_str().to_string(), channel);
    }
}

fn not_found(path: String) -> ApiError {
    ApiError::Status { status: 404, path }
}

#[async_trait]
impl ServerApi for MockApi {
    async fn me(&self) -> Result<User, ApiError> {
        Err(not_found("/users/me".to_string()))
    }

    async fn user(&self, user_id: &UserId) -> Result<User, ApiError> {
        self.record(format!("user {user_id}"));
        self.users
            .lock()
            .unwrap()
            .get(user_id.as_str())
            .cloned()
            .ok_or_else(|| not_found(format!("/users/{user_id}")))
    }

    async fn statuses_by_ids(&self, user_ids: &[UserId]) -> Result<Vec<Status>, ApiError> {
        self.record(format!("statuses {}", user_ids.len()));
        Ok(Vec::new())
    }

    async fn my_teams(&self) -> Result<Vec<Team>, ApiError> {
        self.record("my_teams".to_string());
        Ok(Vec::new())
    }

    async fn team(&self, team_id: &TeamId) -> Result<Team, ApiError> {
        self.record(format!("team {team_id}"));
        self.teams
            .lock()
            .unwrap()
            .get(team_id.as_str())
            .cloned()
            .ok_or_else(|| not_found(format!("/teams/{team_id}")))
    }

    async fn my_channels(&self, team_id: &TeamId) -> Result<Vec<Channel>, ApiError> {
        self.record(format!("my_channels {team_id}"));
        Ok(Vec::new())
    }

    async fn my_channel_members(
        &self,
        team_id: &TeamId,
    ) -> Result<Vec<ChannelMember>, ApiError> {
        self.record(format!("my_channel_members {team_id}"));
        Ok(Vec::new())
    }

    async fn channel(&self, channel_id: &ChannelId) -> Result<Channel, ApiError> {
        self.record(format!("channel {channel_id}"));
        self.channels
            .lock()
            .unwrap()
            .get(channel_id.as_str())
            .cloned()
            .ok_or_else(|| not_found(format!("/channels/{channel_id}")))
    }

    async fn my_channel_member(
        &self,
        channel_id: &ChannelId,
    ) -> Result<ChannelMember, ApiError> {
        self.record(format!("my_channel_member {channel_id}"));
        self.members
            .lock()
            .unwrap()
            .get(channel_id.as_str())
            .cloned()
            .ok_or_else(|| not_found(format!("/channels/{channel_id}/members/me")))
    }

    async fn channel_stats(&self, channel_id: &ChannelId) -> Result<ChannelStats, ApiError> {
        self.record(format!("channel_stats {channel_id}"));
        Ok(ChannelStats {
            channel_id: channel_id.clone(),
            member_count: 5,
        })
    }

    async fn posts(&self, channel_id: &ChannelId) -> Result<Vec<Post>, ApiError> {
        self.record(format!("posts {channel_id}"));
        Ok(Vec::new())
    }

    async fn posts_since(
        &self,
        channel_id: &ChannelId,
        since: i64,
    ) -> Result<Vec<Post>, ApiError> {
        self.record(format!("posts_since {channel_id} {since}"));
        Ok(Vec::new())
    }

    async fn client_config(&self) -> Result<HashMap<String, String>, ApiError> {
        self.record("client_config".to_string());
        Ok(HashMap::from([(
            "Version".to_string(),
            "9.5.0".to_string(),
        )]))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn channel(id: &str, team: &str, name: &str, kind: ChannelKind) -> Channel {
    Channel {
        id: ChannelId::from(id),
        team_id: Some(TeamId::from(team)),
        kind,
        name: name.to_string(),
        display_name: name.to_string(),
        create_at: 1,
        update_at: 1,
        delete_at: 0,
    }
}

fn member(channel: &str, user: &str) -> ChannelMember {
    ChannelMember {
        channel_id: ChannelId::from(channel),
        user_id: UserId::from(user),
        roles: "channel_user".to_string(),
        last_viewed_at: 0,
        msg_count: 0,
        mention_count: 0,
    }
}

fn post(id: &str, channel: &str, user: &str, create_at: i64) -> Post {
    Post {
        id: PostId::from(id),
        channel_id: ChannelId::from(channel),
        user_id: UserId::from(user),
        root_id: None,
        message: format!("message {id}"),
        create_at,
        update_at: create_at,
        delete_at: 0,
        is_pinned: false,
    }
}

/// A session for user `u1` viewing channel `c1` on team `t1`, with the
/// team's default channel also cached.
fn viewing_session() -> Arc<Mutex<Session>> {
    let mut session = Session::new(UserId::from("u1"));
    session
        .store
        .channels
        .upsert(channel("c1", "t1", "dev", ChannelKind::Open));
    session
        .store
        .channels
        .upsert(channel("c0", "t1", DEFAULT_CHANNEL_NAME, ChannelKind::Open));
    session.store.channels.upsert_my_member(member("c1", "u1"));
    session.store.channels.upsert_my_member(member("c0", "u1"));
    session.current_team_id = Some(TeamId::from("t1"));
    session.current_channel_id = Some(ChannelId::from("c1"));
    Arc::new(Mutex::new(session))
}

struct Harness {
    session: Arc<Mutex<Session>>,
    api: Arc<MockApi>,
    rc: Reconciler,
    ui_rx: broadcast::Receiver<UiEvent>,
}

fn harness(session: Arc<Mutex<Session>>, api: MockApi) -> Harness {
    let api = Arc::new(api);
    let (ui, ui_rx) = UiSender::new(64);
    let rc = Reconciler::new(session.clone(), api.clone(), ui);
    Harness {
        session,
        api,
        rc,
        ui_rx,
    }
}

fn drain(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_posted_caches_and_notifies_once() {
    let mut h = harness(viewing_session(), MockApi::default());

    let event = || ServerEvent::Posted {
        post: post("p1", "c1", "u2", 100),
        set_online: true,
    };
    h.rc.handle_event(event()).await;
    h.rc.handle_event(event()).await;

    let session = h.session.lock().unwrap();
    assert_eq!(
        session.store.posts.channel_posts(&ChannelId::from("c1")).len(),
        1
    );
    drop(session);

    let new_posts = drain(&mut h.ui_rx)
        .into_iter()
        .filter(|e| matches!(e, UiEvent::NewPost { .. }))
        .count();
    assert_eq!(new_posts, 1);
}

#[tokio::test]
async fn test_posted_in_unknown_channel_fetches_it() {
    let api = MockApi::default();
    api.put_channel(
        channel("c9", "t1", "surprise", ChannelKind::Open),
        Some(member("c9", "u1")),
    );
    let mut h = harness(viewing_session(), api);

    h.rc.handle_event(ServerEvent::Posted {
        post: post("p1", "c9", "u2", 100),
        set_online: false,
    })
    .await;

    assert!(h.api.called("channel c9"));
    assert!(h.api.called("my_channel_member c9"));
    let session = h.session.lock().unwrap();
    assert!(session.store.channels.get(&ChannelId::from("c9")).is_some());
    assert!(session
        .store
        .channels
        .my_member(&ChannelId::from("c9"))
        .is_some());
    drop(session);
    assert_eq!(drain(&mut h.ui_rx).len(), 1);
}

#[tokio::test]
async fn test_unknown_event_is_dropped_silently() {
    let mut h = harness(viewing_session(), MockApi::default());

    let envelope: EventEnvelope = serde_json::from_str(
        r#"{"event":"custom_plugin_event","data":{"anything":"goes"},"broadcast":{},"seq":4}"#,
    )
    .unwrap();
    h.rc.handle_envelope(&envelope).await;

    assert!(h.api.calls().is_empty());
    assert!(drain(&mut h.ui_rx).is_empty());
}

#[tokio::test]
async fn test_channel_deleted_redirects_viewer_to_default() {
    let mut h = harness(viewing_session(), MockApi::default());
    h.session
        .lock()
        .unwrap()
        .store
        .posts
        .upsert(post("p1", "c1", "u2", 100));

    h.rc.handle_event(ServerEvent::ChannelDeleted {
        channel_id: ChannelId::from("c1"),
        team_id: Some(TeamId::from("t1")),
        delete_at: 500,
    })
    .await;

    let session = h.session.lock().unwrap();
    assert_eq!(session.current_channel_id, Some(ChannelId::from("c0")));
    assert!(session
        .store
        .posts
        .channel_posts(&ChannelId::from("c1"))
        .is_empty());
    assert_eq!(
        session
            .store
            .channels
            .get(&ChannelId::from("c1"))
            .unwrap()
            .delete_at,
        500
    );
    drop(session);

    let events = drain(&mut h.ui_rx);
    assert!(events.iter().any(|e| matches!(
        e,
        UiEvent::NavigateToChannel { channel_id, .. } if channel_id == &ChannelId::from("c0")
    )));
}

#[tokio::test]
async fn test_channel_deleted_elsewhere_does_not_navigate() {
    let mut h = harness(viewing_session(), MockApi::default());

    h.rc.handle_event(ServerEvent::ChannelDeleted {
        channel_id: ChannelId::from("c0"),
        team_id: Some(TeamId::from("t1")),
        delete_at: 500,
    })
    .await;

    assert_eq!(
        h.session.lock().unwrap().current_channel_id,
        Some(ChannelId::from("c1"))
    );
    assert!(drain(&mut h.ui_rx).is_empty());
}

#[tokio::test]
async fn test_user_added_to_viewed_channel_refetches_stats() {
    let mut h = harness(viewing_session(), MockApi::default());

    h.rc.handle_event(ServerEvent::UserAdded {
        user_id: UserId::from("u2"),
        team_id: Some(TeamId::from("t1")),
        channel_id: Some(ChannelId::from("c1")),
    })
    .await;

    assert!(h.api.called("channel_stats c1"));
    let session = h.session.lock().unwrap();
    assert!(session
        .store
        .channels
        .is_member(&ChannelId::from("c1"), &UserId::from("u2")));
    assert_eq!(
        session
            .store
            .channels
            .stats(&ChannelId::from("c1"))
            .unwrap()
            .member_count,
        5
    );
    drop(session);
    drain(&mut h.ui_rx);
}

#[tokio::test]
async fn test_own_removal_from_viewed_channel_redirects() {
    let mut h = harness(viewing_session(), MockApi::default());
    h.session
        .lock()
        .unwrap()
        .store
        .posts
        .upsert(post("p1", "c1", "u2", 100));

    h.rc.handle_event(ServerEvent::UserRemoved {
        user_id: Some(UserId::from("u1")),
        channel_id: Some(ChannelId::from("c1")),
        remover_id: Some(UserId::from("u2")),
    })
    .await;

    let session = h.session.lock().unwrap();
    assert!(session.store.channels.my_member(&ChannelId::from("c1")).is_none());
    assert!(session
        .store
        .posts
        .channel_posts(&ChannelId::from("c1"))
        .is_empty());
    assert_eq!(session.current_channel_id, Some(ChannelId::from("c0")));
    drop(session);

    let events = drain(&mut h.ui_rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, UiEvent::RemovedFromChannel { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, UiEvent::NavigateToChannel { .. })));
}

#[tokio::test]
async fn test_other_users_removal_only_touches_membership() {
    let mut h = harness(viewing_session(), MockApi::default());
    h.session
        .lock()
        .unwrap()
        .store
        .channels
        .add_member(&ChannelId::from("c1"), UserId::from("u2"));

    h.rc.handle_event(ServerEvent::UserRemoved {
        user_id: Some(UserId::from("u2")),
        channel_id: Some(ChannelId::from("c1")),
        remover_id: None,
    })
    .await;

    let session = h.session.lock().unwrap();
    assert!(!session
        .store
        .channels
        .is_member(&ChannelId::from("c1"), &UserId::from("u2")));
    assert!(session.store.channels.my_member(&ChannelId::from("c1")).is_some());
    drop(session);
    assert!(h.api.called("channel_stats c1"));
}

#[tokio::test]
async fn test_direct_added_fetches_channel_and_membership() {
    let api = MockApi::default();
    let mut direct = channel("d1", "", "u1__u2", ChannelKind::Direct);
    direct.team_id = None;
    api.put_channel(direct, Some(member("d1", "u1")));
    let h = harness(viewing_session(), api);

    h.rc.handle_event(ServerEvent::DirectAdded {
        channel_id: ChannelId::from("d1"),
    })
    .await;

    let session = h.session.lock().unwrap();
    assert!(session.store.channels.get(&ChannelId::from("d1")).is_some());
    assert!(session.store.channels.my_member(&ChannelId::from("d1")).is_some());
}

#[tokio::test]
async fn test_connectivity_banner_on_seventh_failure_and_clear() {
    let mut h = harness(viewing_session(), MockApi::default());

    for n in 1..MAX_SOCKET_FAILS {
        h.rc.handle_notification(SocketNotification::Closed {
            consecutive_failures: n,
        })
        .await;
    }
    assert!(drain(&mut h.ui_rx).is_empty());

    h.rc.handle_notification(SocketNotification::Closed {
        consecutive_failures: MAX_SOCKET_FAILS,
    })
    .await;
    assert!(drain(&mut h.ui_rx)
        .iter()
        .any(|e| matches!(e, UiEvent::ConnectivityBanner { visible: true })));

    h.rc.handle_notification(SocketNotification::Reconnected).await;
    assert!(drain(&mut h.ui_rx)
        .iter()
        .any(|e| matches!(e, UiEvent::ConnectivityBanner { visible: false })));
    // Reconnecting re-fetches the current team and viewed channel.
    assert!(h.api.called("my_channels t1"));
    assert!(h.api.called("posts c1"));
}

#[tokio::test]
async fn test_missed_events_trigger_full_resync() {
    let h = harness(viewing_session(), MockApi::default());

    h.rc.handle_notification(SocketNotification::MissedEvents).await;

    assert!(h.api.called("my_channels t1"));
    assert!(h.api.called("my_channel_members t1"));
    assert!(h.api.called("posts c1"));
    assert!(h.api.called("client_config"));
    assert_eq!(
        h.session.lock().unwrap().client_config.get("Version"),
        Some(&"9.5.0".to_string())
    );
}

#[tokio::test]
async fn test_resync_uses_incremental_fetch_when_posts_cached() {
    let h = harness(viewing_session(), MockApi::default());
    h.session
        .lock()
        .unwrap()
        .store
        .posts
        .upsert(post("p1", "c1", "u2", 250));

    h.rc.handle_notification(SocketNotification::Reconnected).await;

    assert!(h.api.called("posts_since c1 250"));
}

#[tokio::test]
async fn test_leave_team_relocates_to_other_team() {
    let session = viewing_session();
    {
        let mut s = session.lock().unwrap();
        s.store.teams.upsert(Team {
            id: TeamId::from("t1"),
            name: "alpha".to_string(),
            display_name: "Alpha".to_string(),
            update_at: 1,
            delete_at: 0,
        });
        s.store.teams.upsert(Team {
            id: TeamId::from("t2"),
            name: "beta".to_string(),
            display_name: "Beta".to_string(),
            update_at: 1,
            delete_at: 0,
        });
        s.store.teams.join(TeamId::from("t1"));
        s.store.teams.join(TeamId::from("t2"));
        s.store
            .channels
            .upsert(channel("c2", "t2", DEFAULT_CHANNEL_NAME, ChannelKind::Open));
    }
    let mut h = harness(session, MockApi::default());

    h.rc.handle_event(ServerEvent::LeaveTeam {
        team_id: TeamId::from("t1"),
        user_id: UserId::from("u1"),
    })
    .await;

    let session = h.session.lock().unwrap();
    assert_eq!(session.current_team_id, Some(TeamId::from("t2")));
    assert_eq!(session.current_channel_id, Some(ChannelId::from("c2")));
    assert!(session.store.channels.get(&ChannelId::from("c1")).is_none());
    drop(session);

    assert!(drain(&mut h.ui_rx).iter().any(|e| matches!(
        e,
        UiEvent::NavigateToChannel { team_id, .. } if team_id == &TeamId::from("t2")
    )));
}

#[tokio::test]
async fn test_typing_fetches_missing_profile() {
    let api = MockApi::default();
    api.users.lock().unwrap().insert(
        "u3".to_string(),
        User {
            id: UserId::from("u3"),
            username: "carol".to_string(),
            nickname: String::new(),
            roles: "system_user".to_string(),
            update_at: 1,
            delete_at: 0,
        },
    );
    let mut h = harness(viewing_session(), api);

    h.rc.handle_event(ServerEvent::Typing {
        channel_id: Some(ChannelId::from("c1")),
        user_id: UserId::from("u3"),
        parent_id: None,
    })
    .await;

    assert!(h.api.called("user u3"));
    assert_eq!(
        h.session
            .lock()
            .unwrap()
            .store
            .users
            .get(&UserId::from("u3"))
            .unwrap()
            .username,
        "carol"
    );
    assert!(drain(&mut h.ui_rx)
        .iter()
        .any(|e| matches!(e, UiEvent::Typing { .. })));
}
