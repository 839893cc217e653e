//! Session lifecycle: identity bootstrap plus the inbound dispatch loop.
//!
//! Bootstrap is ordered and fail-fast -- REST probe, websocket connect,
//! self-identity lookup -- with no retry; the caller decides whether to
//! restart. Once running, exactly one task executes the dispatch loop, and
//! per-event failures never escape it.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::event::GenericEvent;

use super::action::ActionDispatcher;
use super::client::MattermostClient;
use super::identity::{IdentityCache, UserLookup};
use super::stream::EventStream;
use super::translate::Translator;
use super::BridgeError;

/// Resolved session identity, immutable after bootstrap.
#[derive(Debug, Clone)]
pub struct Session {
    /// The authenticated user's id. Inbound events authored by this id are
    /// suppressed (loop protection).
    pub user_id: String,
    /// The authenticated user's username.
    pub username: String,
    /// Server version reported by the connectivity probe.
    pub server_version: String,
}

/// A live bridge session: connection, identity, and the event stream.
pub struct SessionBridge {
    source: String,
    client: Arc<MattermostClient>,
    stream: EventStream,
    session: Session,
    identities: Arc<IdentityCache>,
}

impl SessionBridge {
    /// Establish a session. Ordered bootstrap, each step fatal on failure:
    ///
    /// 1. REST client with the configured credential.
    /// 2. Connectivity probe via the old-format client config call.
    /// 3. Websocket event stream connect + authentication.
    /// 4. Self-identity lookup, required for loop protection.
    ///
    /// There is no retry; a failed step returns [`BridgeError::Connection`].
    pub async fn connect(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = Arc::new(MattermostClient::new(&config.api_url, &config.auth_token));

        let props = client.client_config().await.map_err(|e| {
            BridgeError::Connection(format!("could not reach the Mattermost API: {e}"))
        })?;
        let server_version = props.get("Version").cloned().unwrap_or_default();
        debug!(version = %server_version, "server detected");

        let stream = EventStream::connect(&config.ws_url, &config.auth_token).await?;

        let etag = Uuid::new_v4().to_string();
        let me = client.get_me(&etag).await.map_err(|e| {
            BridgeError::Connection(format!(
                "could not resolve own identity, loop protection not possible: {e}"
            ))
        })?;
        info!(user_id = %me.id, username = %me.username, "session identity resolved");

        let lookup: Arc<dyn UserLookup> = client.clone();
        let identities = Arc::new(IdentityCache::new(lookup));

        Ok(Self {
            source: config.source_name().to_owned(),
            client,
            stream,
            session: Session {
                user_id: me.id,
                username: me.username,
                server_version,
            },
            identities,
        })
    }

    /// The resolved session identity.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The identity cache backing translation. Hosts may pre-seed it.
    pub fn identities(&self) -> Arc<IdentityCache> {
        self.identities.clone()
    }

    /// An action dispatcher sharing this session's client. Safe to use
    /// concurrently with [`SessionBridge::run`].
    pub fn action_dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(self.client.clone())
    }

    /// Run the inbound dispatch loop until shutdown.
    ///
    /// Blocks on the next raw event, hands it to the translator, and
    /// publishes produced generic events to `event_tx`. Returns `Ok(())` on
    /// a shutdown signal or when the host drops its receiver; returns
    /// [`BridgeError::Connection`] when the event stream ends on its own,
    /// so the caller can distinguish a stop from a lost connection.
    pub async fn run(
        mut self,
        event_tx: mpsc::Sender<GenericEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), BridgeError> {
        let translator = Translator::new(
            self.source.clone(),
            self.session.user_id.clone(),
            self.identities.clone(),
        );
        info!(source = %self.source, "entering dispatch loop");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("shutdown signal received, stopping dispatch loop");
                    return Ok(());
                }
                raw = self.stream.next() => {
                    let Some(raw) = raw else {
                        warn!("event stream ended");
                        return Err(BridgeError::Connection(
                            "event stream closed unexpectedly".to_owned(),
                        ));
                    };
                    if let Some(event) = translator.translate(&raw).await {
                        if event_tx.send(event).await.is_err() {
                            info!("host event channel closed, stopping dispatch loop");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
