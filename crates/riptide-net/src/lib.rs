//! Realtime transport: websocket endpoint derivation and the connection
//! task that keeps a socket alive across drops.

pub mod endpoint;
pub mod error;
pub mod socket;

pub use endpoint::socket_url;
pub use error::NetError;
pub use socket::{
    spawn_socket, ConnectionState, SocketCommand, SocketConfig, SocketNotification,
};
