//! Translation from raw websocket events to generic events.
//!
//! Dispatch is a closed match on the event kind tag; unmatched kinds
//! yield nothing. Each supported kind decodes its required fields, applies
//! loop protection where the event carries an authoring user id, enriches
//! user ids with display names from the identity cache, and emits a
//! placeholder list that is fixed per kind: names, order, and declared
//! types are part of the contract with the host.
//!
//! Per-event failures never escape: a malformed sub-payload or missing
//! field logs and drops that single event.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::event::{GenericEvent, Placeholder};

use super::client::{Post, Reaction};
use super::identity::IdentityCache;
use super::stream::RawEvent;

/// Translates one raw inbound event into zero or one generic events.
///
/// Pure besides identity-cache population: the same raw event and cache
/// state always produce the same output.
pub struct Translator {
    source: String,
    self_id: String,
    identities: Arc<IdentityCache>,
}

impl Translator {
    /// Create a translator emitting events under `source`, suppressing
    /// events authored by `self_id`.
    pub fn new(
        source: impl Into<String>,
        self_id: impl Into<String>,
        identities: Arc<IdentityCache>,
    ) -> Self {
        Self {
            source: source.into(),
            self_id: self_id.into(),
            identities,
        }
    }

    /// Translate a raw event. Returns `None` for unknown kinds, self-authored
    /// messages/reactions, and events with undecodable required fields.
    pub async fn translate(&self, raw: &RawEvent) -> Option<GenericEvent> {
        match raw.event.as_str() {
            "hello" => self.hello(raw).await,
            // New posts arrive as `posted`; the generic kind name is also
            // accepted so hosts replaying generic captures round-trip.
            "posted" | "message" => self.message(raw).await,
            "reaction_added" => self.reaction(raw, true).await,
            "reaction_removed" => self.reaction(raw, false).await,
            "status_change" => self.status_change(raw).await,
            "user_added" => self.user_added(raw).await,
            "user_removed" => self.user_removed(raw).await,
            other => {
                debug!(kind = other, "websocket event kind is not handled");
                None
            }
        }
    }

    /// `hello`: connection established; carries the server version.
    async fn hello(&self, raw: &RawEvent) -> Option<GenericEvent> {
        let server_version = self.require_str(raw, "server_version")?;
        let user_id = raw.broadcast.user_id.clone();
        let user_name = self.username(&user_id).await;
        Some(self.emit(
            "hello",
            vec![
                Placeholder::text("user_id", user_id),
                Placeholder::text("user_name", user_name),
                Placeholder::text("server_version", server_version),
            ],
        ))
    }

    /// `posted`: a new message. Dropped when authored by this session.
    async fn message(&self, raw: &RawEvent) -> Option<GenericEvent> {
        let post: Post = self.decode_sub_payload(raw, "post")?;
        if post.user_id == self.self_id {
            debug!("skipping own message");
            return None;
        }
        let user_name = self.username(&post.user_id).await;
        Some(self.emit(
            "message",
            vec![
                Placeholder::text("id", post.id),
                Placeholder::text("channel_id", post.channel_id),
                Placeholder::text("user_id", post.user_id),
                Placeholder::text("user_name", user_name),
                Placeholder::text("text", post.message),
            ],
        ))
    }

    /// `reaction_added` / `reaction_removed`. Dropped when authored by this
    /// session. Only the added form carries the creation timestamp.
    async fn reaction(&self, raw: &RawEvent, added: bool) -> Option<GenericEvent> {
        let reaction: Reaction = self.decode_sub_payload(raw, "reaction")?;
        if reaction.user_id == self.self_id {
            debug!(added, "skipping own reaction");
            return None;
        }
        let user_name = self.username(&reaction.user_id).await;
        let mut placeholders = vec![
            Placeholder::text("user_id", reaction.user_id),
            Placeholder::text("user_name", user_name),
            Placeholder::text("post_id", reaction.post_id),
            Placeholder::text("emoji_name", reaction.emoji_name),
        ];
        let kind = if added {
            placeholders.push(Placeholder::integer("create_at", reaction.create_at));
            "reaction_added"
        } else {
            "reaction_removed"
        };
        Some(self.emit(kind, placeholders))
    }

    /// `status_change`: a user's presence changed.
    async fn status_change(&self, raw: &RawEvent) -> Option<GenericEvent> {
        let user_id = self.require_str(raw, "user_id")?.to_owned();
        let status = self.require_str(raw, "status")?;
        let user_name = self.username(&user_id).await;
        Some(self.emit(
            "status_change",
            vec![
                Placeholder::text("user_id", user_id),
                Placeholder::text("user_name", user_name),
                Placeholder::text("status", status),
            ],
        ))
    }

    /// `user_added`: a user joined a channel.
    async fn user_added(&self, raw: &RawEvent) -> Option<GenericEvent> {
        let user_id = self.require_str(raw, "user_id")?.to_owned();
        let team_id = self.require_str(raw, "team_id")?;
        let user_name = self.username(&user_id).await;
        Some(self.emit(
            "user_added",
            vec![
                Placeholder::text("user_id", user_id),
                Placeholder::text("user_name", user_name),
                Placeholder::text("channel_id", raw.broadcast.channel_id.clone()),
                Placeholder::text("team_id", team_id),
            ],
        ))
    }

    /// `user_removed`: a user left or was removed from a channel.
    async fn user_removed(&self, raw: &RawEvent) -> Option<GenericEvent> {
        let user_id = self.require_str(raw, "user_id")?.to_owned();
        let remover_id = self.require_str(raw, "remover_id")?;
        let user_name = self.username(&user_id).await;
        Some(self.emit(
            "user_removed",
            vec![
                Placeholder::text("user_id", user_id),
                Placeholder::text("user_name", user_name),
                Placeholder::text("channel_id", raw.broadcast.channel_id.clone()),
                Placeholder::text("remover_id", remover_id),
            ],
        ))
    }

    async fn username(&self, user_id: &str) -> String {
        self.identities.resolve(user_id).await.username
    }

    fn emit(&self, kind: &str, placeholders: Vec<Placeholder>) -> GenericEvent {
        GenericEvent {
            source: self.source.clone(),
            kind: kind.to_owned(),
            placeholders,
        }
    }

    /// Fetch a required string field from the data map, logging and
    /// returning `None` when absent.
    fn require_str<'a>(&self, raw: &'a RawEvent, key: &str) -> Option<&'a str> {
        let value = raw.data_str(key);
        if value.is_none() {
            error!(
                kind = %raw.event,
                field = key,
                "event is missing a required field, dropping"
            );
        }
        value
    }

    /// Decode a structured sub-payload from a data field. The platform
    /// delivers these as JSON-encoded strings; pre-parsed objects are also
    /// accepted.
    fn decode_sub_payload<T: DeserializeOwned>(&self, raw: &RawEvent, key: &str) -> Option<T> {
        let value = raw.data.get(key);
        let Some(value) = value else {
            error!(kind = %raw.event, field = key, "event is missing its sub-payload, dropping");
            return None;
        };
        let decoded = match value {
            Value::String(encoded) => serde_json::from_str(encoded),
            other => serde_json::from_value(other.clone()),
        };
        match decoded {
            Ok(payload) => Some(payload),
            Err(e) => {
                error!(
                    kind = %raw.event,
                    field = key,
                    error = %e,
                    "could not parse sub-payload, dropping event"
                );
                None
            }
        }
    }
}
