//! Websocket event stream for the Mattermost API.
//!
//! Connects to `/api/v4/websocket`, authenticates with a challenge frame,
//! and forwards decoded event envelopes over an mpsc channel. The read side
//! runs as a background Tokio task; the session bridge consumes events via
//! [`EventStream::next`].

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::BridgeError;

type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Buffer size for the decoded-event channel.
const EVENT_BUFFER: usize = 100;

/// Broadcast metadata attached to a websocket event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Broadcast {
    /// User the event was broadcast for, when applicable.
    #[serde(default)]
    pub user_id: String,
    /// Channel the event was broadcast to, when applicable.
    #[serde(default)]
    pub channel_id: String,
}

/// A raw inbound event envelope: a kind tag plus a map of named fields.
///
/// Consumed once by the translator. Field values are strings,
/// JSON-encoded sub-documents, or pre-parsed sub-objects depending on the
/// event kind.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    /// Event kind tag (`posted`, `reaction_added`, ...).
    pub event: String,
    /// Named event data fields.
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
    /// Broadcast metadata.
    #[serde(default)]
    pub broadcast: Broadcast,
}

impl RawEvent {
    /// Create an envelope with an empty data map and broadcast. Handy for
    /// building events field by field.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: serde_json::Map::new(),
            broadcast: Broadcast::default(),
        }
    }

    /// Get a string-valued data field.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Duplex event stream connection.
///
/// Dropping the stream aborts the background read task.
pub struct EventStream {
    events: mpsc::Receiver<RawEvent>,
    reader: tokio::task::JoinHandle<()>,
}

impl EventStream {
    /// Connect to the websocket endpoint and authenticate.
    ///
    /// The authentication challenge is sent immediately after the connect;
    /// the server answers with a status frame (skipped by the read loop) and
    /// then a `hello` event.
    pub async fn connect(ws_url: &str, token: &str) -> Result<Self, BridgeError> {
        let url = format!("{}/api/v4/websocket", ws_url.trim_end_matches('/'));
        info!(%url, "connecting to Mattermost event stream");

        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| BridgeError::Connection(format!("websocket connect failed: {e}")))?;
        let (mut write, read) = ws.split();

        let challenge = serde_json::json!({
            "seq": 1,
            "action": "authentication_challenge",
            "data": { "token": token },
        });
        write
            .send(WsMessage::Text(challenge.to_string()))
            .await
            .map_err(|e| {
                BridgeError::Connection(format!("websocket authentication failed: {e}"))
            })?;

        let (event_tx, events) = mpsc::channel(EVENT_BUFFER);
        let reader = tokio::spawn(read_loop(read, write, event_tx));

        Ok(Self { events, reader })
    }

    /// Receive the next decoded event. Returns `None` when the connection
    /// has closed.
    pub async fn next(&mut self) -> Option<RawEvent> {
        self.events.recv().await
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read frames until the connection closes, decoding event envelopes and
/// forwarding them to the channel. Pings are answered inline.
async fn read_loop(
    mut read: SplitStream<WsConnection>,
    mut write: SplitSink<WsConnection, WsMessage>,
    event_tx: mpsc::Sender<RawEvent>,
) {
    while let Some(frame) = read.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => {
                if let Some(event) = decode_frame(&text) {
                    if event_tx.send(event).await.is_err() {
                        debug!("event receiver dropped, stopping websocket reader");
                        return;
                    }
                }
            }
            Ok(WsMessage::Ping(data)) => {
                if write.send(WsMessage::Pong(data)).await.is_err() {
                    warn!("failed to answer websocket ping");
                    return;
                }
            }
            Ok(WsMessage::Close(_)) => {
                info!("websocket closed by server");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "websocket read error");
                return;
            }
        }
    }
    info!("websocket stream ended");
}

/// Decode a text frame into an event envelope.
///
/// Frames without an `event` tag (auth status replies, sequence acks) are
/// expected traffic and skipped at debug level.
fn decode_frame(text: &str) -> Option<RawEvent> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparsable websocket frame");
            return None;
        }
    };
    if value.get("event").is_none() {
        debug!("skipping non-event websocket frame");
        return None;
    }
    match serde_json::from_value::<RawEvent>(value) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "malformed websocket event envelope");
            None
        }
    }
}
