//! Wires the socket task to the reconciler and runs the periodic sweep.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use riptide_net::{
    socket_url, spawn_socket, NetError, SocketCommand, SocketConfig, SocketNotification,
};
use riptide_shared::constants::{RECONNECT_DELAY_SECS, SYNC_INTERVAL_SECS};

use crate::config::ClientConfig;
use crate::dispatch::Reconciler;

pub struct BridgeHandle {
    cmd_tx: mpsc::Sender<SocketCommand>,
    notification_task: JoinHandle<()>,
    sweep_task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Close the socket and stop the background tasks.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(SocketCommand::Shutdown).await;
        self.sweep_task.abort();
        let _ = self.notification_task.await;
    }
}

/// Connect the realtime socket and start forwarding its notifications
/// into the reconciler, plus the periodic reconciliation sweep.
pub fn start(rc: Reconciler, config: &ClientConfig) -> Result<BridgeHandle, NetError> {
    let url = socket_url(&config.site_url)?;
    info!(url = %url, "starting realtime connection");

    let (cmd_tx, notify_rx, _state_rx) = spawn_socket(SocketConfig {
        url,
        auth_token: config.auth_token.clone(),
        reconnect_delay: Duration::from_secs(RECONNECT_DELAY_SECS),
    });

    rc.with_session(|s| s.socket_tx = Some(cmd_tx.clone()));

    let notification_task = tokio::spawn(notification_loop(rc.clone(), notify_rx));
    let sweep_task = tokio::spawn(sweep_loop(rc));

    Ok(BridgeHandle {
        cmd_tx,
        notification_task,
        sweep_task,
    })
}

async fn notification_loop(rc: Reconciler, mut notify_rx: mpsc::Receiver<SocketNotification>) {
    while let Some(notification) = notify_rx.recv().await {
        rc.handle_notification(notification).await;
    }
}

/// Safety net for pushes lost without a detectable sequence gap.
async fn sweep_loop(rc: Reconciler) {
    let mut interval = tokio::time::interval(Duration::from_secs(SYNC_INTERVAL_SECS));
    // The first tick fires immediately; the connect path already syncs.
    interval.tick().await;
    loop {
        interval.tick().await;
        rc.resync().await;
    }
}
