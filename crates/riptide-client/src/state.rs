//! Per-session client state: the cache plus what the user is currently
//! looking at and the health of the realtime connection.

use std::collections::HashMap;

use tokio::sync::mpsc;

use riptide_net::SocketCommand;
use riptide_shared::constants::MAX_SOCKET_FAILS;
use riptide_shared::types::{ChannelId, TeamId, UserId};
use riptide_store::Store;

#[derive(Debug)]
pub struct Session {
    pub store: Store,
    pub current_user_id: UserId,
    pub current_team_id: Option<TeamId>,
    pub current_channel_id: Option<ChannelId>,
    /// Reported by the server's hello event.
    pub server_version: Option<String>,
    pub connection_id: Option<String>,
    /// Server-side feature flags, `/config/client` key-value form.
    pub client_config: HashMap<String, String>,
    /// Handle for sending actions back over the socket, set once the
    /// connection task is running.
    pub socket_tx: Option<mpsc::Sender<SocketCommand>>,
    socket_failures: u32,
    connectivity_error: bool,
}

impl Session {
    pub fn new(current_user_id: UserId) -> Self {
        Self {
            store: Store::new(),
            current_user_id,
            current_team_id: None,
            current_channel_id: None,
            server_version: None,
            connection_id: None,
            client_config: HashMap::new(),
            socket_tx: None,
            socket_failures: 0,
            connectivity_error: false,
        }
    }

    pub fn is_me(&self, user_id: &UserId) -> bool {
        &self.current_user_id == user_id
    }

    pub fn viewing(&self, channel_id: &ChannelId) -> bool {
        self.current_channel_id.as_ref() == Some(channel_id)
    }

    pub fn connectivity_error(&self) -> bool {
        self.connectivity_error
    }

    /// Record a successful connection. Returns whether a visible
    /// connectivity error was just cleared.
    pub fn record_socket_success(&mut self) -> bool {
        self.socket_failures = 0;
        std::mem::take(&mut self.connectivity_error)
    }

    /// Record a dropped or failed connection attempt. Returns whether the
    /// connectivity error became visible with this failure.
    pub fn record_socket_failure(&mut self, consecutive_failures: u32) -> bool {
        self.socket_failures = consecutive_failures;
        if consecutive_failures >= MAX_SOCKET_FAILS && !self.connectivity_error {
            self.connectivity_error = true;
            return true;
        }
        false
    }
}
