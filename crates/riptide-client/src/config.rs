use std::env;

/// Client configuration, read from the environment with sensible local
/// defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the server is reached at, e.g. `https://chat.example.com`.
    pub site_url: String,
    /// Personal access token or session token. Without one the websocket
    /// relies on ambient cookie auth and most deployments will reject it.
    pub auth_token: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            site_url: env::var("RIPTIDE_SITE_URL")
                .unwrap_or_else(|_| "http://localhost:8065".to_string()),
            auth_token: env::var("RIPTIDE_TOKEN").ok(),
        }
    }
}
