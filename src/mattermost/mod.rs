//! Mattermost bridge: REST client, websocket event stream, identity cache,
//! event translator, action dispatcher, and the session that ties them
//! together.
//!
//! The bridge holds one persistent websocket session per process. Inbound
//! platform events flow through [`translate::Translator`] into the host's
//! event channel; outbound [`crate::event::GenericAction`]s go through
//! [`action::ActionDispatcher`] to the REST API.

pub mod action;
pub mod client;
pub mod identity;
pub mod session;
pub mod stream;
pub mod translate;

/// Errors from the Mattermost bridge.
///
/// Bootstrap failures (`Connection`) propagate out of
/// [`session::SessionBridge::connect`]; everything else is scoped to a
/// single event or action and never crosses the dispatch loop.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Session establishment failed (connectivity, auth, or the self-identity
    /// lookup). Fatal for the bridge; the caller decides whether to retry.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A recognized event carried a malformed or missing sub-payload.
    #[error("failed to decode {0}")]
    Decode(String),

    /// A user-profile fetch failed. Soft failure: translation proceeds with
    /// a default profile.
    #[error("identity resolution failed for user {user_id}: {reason}")]
    Resolution {
        /// The user id whose profile could not be fetched.
        user_id: String,
        /// Platform-reported reason.
        reason: String,
    },

    /// The platform rejected an outbound action.
    #[error("action dispatch failed: {0}")]
    Dispatch(String),

    /// The host issued an action kind this bridge does not recognize.
    #[error("unsupported action kind: {0}")]
    UnsupportedAction(String),

    /// HTTP transport error.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Websocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(String),
}
