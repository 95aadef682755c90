//! Client-side reconciliation layer: keeps an in-memory cache consistent
//! with the server by folding pushed events into it and falling back to
//! REST fetches whenever events may have been missed.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
mod handlers;
pub mod socket_bridge;
pub mod state;

pub use api::{HttpApi, ServerApi};
pub use config::ClientConfig;
pub use dispatch::Reconciler;
pub use error::ApiError;
pub use events::{UiEvent, UiSender};
pub use socket_bridge::BridgeHandle;
pub use state::Session;
