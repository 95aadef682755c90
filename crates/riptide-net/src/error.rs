use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetError {
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid site url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported url scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("failed to encode outgoing action: {0}")]
    Encode(#[from] serde_json::Error),
}
