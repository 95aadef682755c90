//! Long-lived websocket task.
//!
//! [`spawn_socket`] owns the connection for the life of the process. It
//! authenticates, tracks the server's per-connection sequence numbers,
//! and reconnects with a fixed delay after every drop; there is no
//! terminal failure state. Callers talk to it over two channels, one of
//! commands in and one of [`SocketNotification`]s out, plus a `watch`
//! channel publishing the current [`ConnectionState`].

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use riptide_shared::protocol::{EventEnvelope, InboundFrame};

use crate::error::NetError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Endpoint produced by [`crate::endpoint::socket_url`].
    pub url: Url,
    /// Session token sent in an authentication challenge right after the
    /// connection opens. `None` relies on ambient cookie auth.
    pub auth_token: Option<String>,
    pub reconnect_delay: Duration,
}

/// Instructions accepted by the socket task.
#[derive(Debug)]
pub enum SocketCommand {
    /// Send a named action frame, e.g. a typing indicator.
    SendAction { action: String, data: Value },
    Shutdown,
}

/// Everything the socket task reports upward.
#[derive(Debug)]
pub enum SocketNotification {
    /// The very first successful connection of this task.
    FirstConnect,
    /// A successful connection after at least one drop.
    Reconnected,
    /// A gap in the server sequence numbers; pushed events were lost and
    /// the caller must re-fetch authoritative state.
    MissedEvents,
    Message(EventEnvelope),
    /// The connection dropped or could not be established.
    Closed { consecutive_failures: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Spawn the socket task and hand back its channels.
pub fn spawn_socket(
    config: SocketConfig,
) -> (
    mpsc::Sender<SocketCommand>,
    mpsc::Receiver<SocketNotification>,
    watch::Receiver<ConnectionState>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (notify_tx, notify_rx) = mpsc::channel(256);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    tokio::spawn(run_socket(config, cmd_rx, notify_tx, state_tx));

    (cmd_tx, notify_rx, state_rx)
}

// ---------------------------------------------------------------------------
// Task internals
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ActionFrame<'a> {
    seq: i64,
    action: &'a str,
    data: &'a Value,
}

enum DriveEnd {
    /// Caller asked us to stop, or every receiver is gone.
    Shutdown,
    /// The connection dropped; reconnect after the delay.
    Dropped,
}

async fn run_socket(
    config: SocketConfig,
    mut cmd_rx: mpsc::Receiver<SocketCommand>,
    notify_tx: mpsc::Sender<SocketNotification>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut failures: u32 = 0;
    let mut connected_before = false;

    loop {
        let _ = state_tx.send(ConnectionState::Connecting);

        let end = match connect_async(config.url.as_str()).await {
            Ok((stream, _response)) => {
                info!(url = %config.url, "websocket connected");
                failures = 0;
                let _ = state_tx.send(ConnectionState::Connected);

                let opened = if connected_before {
                    SocketNotification::Reconnected
                } else {
                    SocketNotification::FirstConnect
                };
                connected_before = true;
                if notify_tx.send(opened).await.is_err() {
                    return;
                }

                match drive(&config, stream, &mut cmd_rx, &notify_tx).await {
                    Ok(end) => end,
                    Err(err) => {
                        warn!(error = %err, "websocket connection failed");
                        DriveEnd::Dropped
                    }
                }
            }
            Err(err) => {
                warn!(url = %config.url, error = %err, "websocket connect failed");
                DriveEnd::Dropped
            }
        };

        let _ = state_tx.send(ConnectionState::Disconnected);
        if matches!(end, DriveEnd::Shutdown) {
            return;
        }

        failures += 1;
        if notify_tx
            .send(SocketNotification::Closed {
                consecutive_failures: failures,
            })
            .await
            .is_err()
        {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            cmd = cmd_rx.recv() => match cmd {
                Some(SocketCommand::SendAction { action, .. }) => {
                    debug!(action, "dropping action while disconnected");
                }
                Some(SocketCommand::Shutdown) | None => return,
            }
        }
    }
}

/// Run one established connection until it drops or a shutdown arrives.
async fn drive(
    config: &SocketConfig,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    cmd_rx: &mut mpsc::Receiver<SocketCommand>,
    notify_tx: &mpsc::Sender<SocketNotification>,
) -> Result<DriveEnd, NetError> {
    let (mut sink, mut source) = stream.split();

    // Client-side sequence for outgoing actions; the server echoes it in
    // `seq_reply`.
    let mut action_seq: i64 = 0;
    // Next expected server-side event sequence.
    let mut expected_seq: i64 = 0;

    if let Some(token) = &config.auth_token {
        let data = serde_json::json!({ "token": token });
        send_action(&mut sink, &mut action_seq, "authentication_challenge", &data).await?;
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(SocketCommand::SendAction { action, data }) => {
                    send_action(&mut sink, &mut action_seq, &action, &data).await?;
                }
                Some(SocketCommand::Shutdown) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(DriveEnd::Shutdown);
                }
            },
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !handle_text(&text, &mut expected_seq, notify_tx).await {
                        return Ok(DriveEnd::Shutdown);
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    sink.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("websocket closed by server");
                    return Ok(DriveEnd::Dropped);
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
            }
        }
    }
}

async fn send_action(
    sink: &mut WsSink,
    action_seq: &mut i64,
    action: &str,
    data: &Value,
) -> Result<(), NetError> {
    *action_seq += 1;
    let frame = serde_json::to_string(&ActionFrame {
        seq: *action_seq,
        action,
        data,
    })?;
    trace!(action, seq = *action_seq, "sending action");
    sink.send(Message::Text(frame)).await?;
    Ok(())
}

/// Parse one text frame. Returns `false` when every notification
/// receiver is gone and the task should stop.
async fn handle_text(
    text: &str,
    expected_seq: &mut i64,
    notify_tx: &mpsc::Sender<SocketNotification>,
) -> bool {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(InboundFrame::Event(envelope)) => {
            if envelope.seq != *expected_seq {
                warn!(
                    expected = *expected_seq,
                    got = envelope.seq,
                    "event sequence gap"
                );
                if notify_tx
                    .send(SocketNotification::MissedEvents)
                    .await
                    .is_err()
                {
                    return false;
                }
            }
            *expected_seq = envelope.seq + 1;
            notify_tx
                .send(SocketNotification::Message(envelope))
                .await
                .is_ok()
        }
        Ok(InboundFrame::Reply { status, seq_reply }) => {
            trace!(status, seq_reply, "action acknowledged");
            true
        }
        Err(err) => {
            warn!(error = %err, "dropping unparseable frame");
            true
        }
    }
}
