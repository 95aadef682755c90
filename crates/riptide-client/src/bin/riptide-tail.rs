//! Terminal tail client: connects to a server, follows the default
//! channel of the first joined team and prints whatever the
//! reconciliation layer surfaces.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::Local;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use riptide_client::{
    socket_bridge, ClientConfig, HttpApi, Reconciler, ServerApi, Session, UiEvent, UiSender,
};
use riptide_shared::types::UserId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("riptide_client=debug,riptide_net=debug,riptide_store=info,warn")
        }))
        .init();

    let config = ClientConfig::from_env();
    if config.auth_token.is_none() {
        warn!("RIPTIDE_TOKEN not set, relying on cookie auth");
    }

    let api = Arc::new(HttpApi::new(&config.site_url, config.auth_token.clone()));

    let me = api.me().await.context("authentication failed")?;
    info!(user = %me.username, "authenticated");
    let my_id = me.id.clone();

    let session = Arc::new(Mutex::new(
        bootstrap_session(api.as_ref(), my_id, me).await?,
    ));

    let (ui, mut ui_rx) = UiSender::new(128);
    let api_dyn: Arc<dyn ServerApi> = api;
    let rc = Reconciler::new(session.clone(), api_dyn, ui);

    let bridge = socket_bridge::start(rc, &config)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = ui_rx.recv() => match event {
                Ok(event) => print_event(&session, event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "event feed lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    info!("shutting down");
    bridge.shutdown().await;
    Ok(())
}

/// Seed the session: cache our profile and teams, pick a home team and
/// land on its default channel.
async fn bootstrap_session(
    api: &dyn ServerApi,
    my_id: UserId,
    me: riptide_shared::models::User,
) -> anyhow::Result<Session> {
    let mut session = Session::new(my_id);
    session.store.users.upsert(me);

    let mut teams = api.my_teams().await.context("team listing failed")?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));
    for team in &teams {
        session.store.teams.join(team.id.clone());
    }
    let home_team = teams.first().map(|t| t.id.clone());
    for team in teams {
        session.store.teams.upsert(team);
    }

    if let Some(team_id) = home_team {
        let channels = api.my_channels(&team_id).await.context("channel listing failed")?;
        let members = api.my_channel_members(&team_id).await?;
        for channel in channels {
            session.store.channels.upsert(channel);
        }
        for member in members {
            session.store.channels.upsert_my_member(member);
        }
        session.current_channel_id = session
            .store
            .channels
            .default_channel_for_team(&team_id)
            .map(|c| c.id.clone());
        session.current_team_id = Some(team_id);
    } else {
        warn!("no joined teams, idling");
    }

    Ok(session)
}

fn print_event(session: &Arc<Mutex<Session>>, event: UiEvent) {
    let now = Local::now().format("%H:%M:%S");
    match event {
        UiEvent::NewPost { channel_id, post_id } => {
            let Ok(session) = session.lock() else { return };
            let Some(post) = session.store.posts.get(&post_id) else {
                return;
            };
            let author = session
                .store
                .users
                .get(&post.user_id)
                .map(|u| u.username.as_str())
                .unwrap_or("???");
            let channel = session
                .store
                .channels
                .get(&channel_id)
                .map(|c| c.display_name.as_str())
                .unwrap_or(channel_id.as_str());
            println!("{now} [{channel}] <{author}> {}", post.message);
        }
        UiEvent::Typing {
            channel_id,
            user_id,
        } => {
            let Ok(session) = session.lock() else { return };
            let who = session
                .store
                .users
                .get(&user_id)
                .map(|u| u.username.as_str())
                .unwrap_or(user_id.as_str());
            println!("{now} [{channel_id}] {who} is typing...");
        }
        UiEvent::RemovedFromChannel { channel_id } => {
            println!("{now} ** removed from channel {channel_id}");
        }
        UiEvent::NavigateToChannel {
            team_id,
            channel_id,
        } => {
            println!("{now} ** now following {team_id}/{channel_id}");
        }
        UiEvent::NavigateHome => {
            println!("{now} ** nowhere to go, idling");
        }
        UiEvent::ConnectivityBanner { visible } => {
            if visible {
                println!("{now} ** connection to the server lost, retrying...");
            } else {
                println!("{now} ** connection restored");
            }
        }
    }
}
