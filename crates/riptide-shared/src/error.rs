use thiserror::Error;

/// Errors produced while decoding inbound wire messages.
///
/// A malformed push event is dropped by the dispatcher after logging; it is
/// never allowed to take the connection down.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("event '{event}' is missing field '{field}'")]
    MissingField { event: String, field: &'static str },

    #[error("malformed payload for event '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}
