/// Consecutive connection failures before a persistent connectivity error
/// is surfaced to the user.
pub const MAX_SOCKET_FAILS: u32 = 7;

/// Fixed delay between reconnect attempts, in seconds.
pub const RECONNECT_DELAY_SECS: u64 = 3;

/// Interval of the periodic reconciliation sweep, in seconds.
/// The sweep re-fetches authoritative state in case pushed events were
/// missed without a detectable sequence gap.
pub const SYNC_INTERVAL_SECS: u64 = 15 * 60;

/// Version prefix shared by the REST and websocket endpoints.
pub const API_PATH: &str = "/api/v4";

/// Name of the channel users are redirected to when the one they are
/// viewing goes away.
pub const DEFAULT_CHANNEL_NAME: &str = "town-square";

/// Websocket ports used when the site URL does not carry an explicit one.
pub const DEFAULT_WSS_PORT: u16 = 443;
pub const DEFAULT_WS_PORT: u16 = 80;
