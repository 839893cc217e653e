//! Generic event/action schema exchanged with the host automation engine.
//!
//! The bridge translates platform-native websocket events into
//! [`GenericEvent`]s and receives [`GenericAction`]s from the host. Both
//! sides of the schema are platform-agnostic: events carry an ordered list
//! of named, typed placeholders; actions carry a named option map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A placeholder value. The schema supports strings and 64-bit integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceholderValue {
    /// A string value.
    Text(String),
    /// An integer value (e.g. millisecond timestamps).
    Integer(i64),
}

impl PlaceholderValue {
    /// The declared type name as it appears in the external contract.
    pub fn type_name(&self) -> &'static str {
        match self {
            PlaceholderValue::Text(_) => "string",
            PlaceholderValue::Integer(_) => "integer",
        }
    }

    /// Returns the string value, if this is a string placeholder.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlaceholderValue::Text(s) => Some(s),
            PlaceholderValue::Integer(_) => None,
        }
    }

    /// Returns the integer value, if this is an integer placeholder.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PlaceholderValue::Text(_) => None,
            PlaceholderValue::Integer(n) => Some(*n),
        }
    }
}

/// A single named, typed value attached to a [`GenericEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Placeholder name (part of the per-kind external contract).
    pub name: String,
    /// Placeholder value; its variant determines the declared type.
    pub value: PlaceholderValue,
}

impl Placeholder {
    /// Create a string placeholder.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PlaceholderValue::Text(value.into()),
        }
    }

    /// Create an integer placeholder.
    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: PlaceholderValue::Integer(value),
        }
    }
}

/// A platform-agnostic event published to the host event bus.
///
/// Immutable once constructed; the placeholder list for each kind is fixed
/// by the translation table in `src/mattermost/translate.rs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericEvent {
    /// Name of the bridge instance that produced the event.
    pub source: String,
    /// Event kind (`hello`, `message`, `reaction_added`, ...).
    pub kind: String,
    /// Ordered placeholder list for this kind.
    pub placeholders: Vec<Placeholder>,
}

impl GenericEvent {
    /// Look up a placeholder value by name.
    pub fn placeholder(&self, name: &str) -> Option<&PlaceholderValue> {
        self.placeholders
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// Named option values supplied by the host with a [`GenericAction`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOptions(HashMap<String, String>);

impl ActionOptions {
    /// Create an empty option map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option value, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder-style variant of [`ActionOptions::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Get an option value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// A platform-agnostic action issued by the host, consumed once by the
/// action dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericAction {
    /// Action kind (`send` is the only recognized kind).
    pub kind: String,
    /// Named option values for the action.
    pub options: ActionOptions,
}

impl GenericAction {
    /// Create an action of the given kind with the given options.
    pub fn new(kind: impl Into<String>, options: ActionOptions) -> Self {
        Self {
            kind: kind.into(),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_type_names() {
        let text = Placeholder::text("user_id", "u1");
        let num = Placeholder::integer("create_at", 1_234);
        assert_eq!(text.value.type_name(), "string");
        assert_eq!(num.value.type_name(), "integer");
    }

    #[test]
    fn placeholder_lookup_by_name() {
        let event = GenericEvent {
            source: "mattermost".to_owned(),
            kind: "message".to_owned(),
            placeholders: vec![
                Placeholder::text("id", "p1"),
                Placeholder::text("text", "hi"),
            ],
        };
        assert_eq!(
            event.placeholder("text").and_then(PlaceholderValue::as_str),
            Some("hi")
        );
        assert!(event.placeholder("missing").is_none());
    }

    #[test]
    fn action_options_set_and_get() {
        let opts = ActionOptions::new()
            .with("channel_id", "c1")
            .with("text", "hello");
        assert_eq!(opts.get("channel_id"), Some("c1"));
        assert_eq!(opts.get("parent_id"), None);
    }

    #[test]
    fn placeholder_value_serializes_untagged() {
        let text = serde_json::to_value(PlaceholderValue::Text("hi".to_owned()))
            .expect("serialize text");
        let num =
            serde_json::to_value(PlaceholderValue::Integer(7)).expect("serialize integer");
        assert_eq!(text, serde_json::json!("hi"));
        assert_eq!(num, serde_json::json!(7));
    }
}
