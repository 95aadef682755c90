//! Derives the websocket endpoint from the configured site URL.

use url::Url;

use riptide_shared::constants::{API_PATH, DEFAULT_WSS_PORT, DEFAULT_WS_PORT};

use crate::error::NetError;

/// Turn a site URL into the realtime endpoint: swap the scheme to `ws`
/// or `wss`, keep any explicit port, and append `/api/v4/websocket`
/// after whatever subpath the site is served under.
pub fn socket_url(site_url: &str) -> Result<Url, NetError> {
    let mut url = Url::parse(site_url.trim_end_matches('/'))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(NetError::UnsupportedScheme(other.to_string())),
    };
    if url.set_scheme(scheme).is_err() {
        return Err(NetError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.port().is_none() {
        let port = if scheme == "wss" {
            DEFAULT_WSS_PORT
        } else {
            DEFAULT_WS_PORT
        };
        // A no-op when the port is the scheme default; kept so URLs with
        // a non-default scheme default still round-trip.
        let _ = url.set_port(Some(port));
    }

    let path = format!("{}{}/websocket", url.path().trim_end_matches('/'), API_PATH);
    url.set_path(&path);
    Ok(url)
}
