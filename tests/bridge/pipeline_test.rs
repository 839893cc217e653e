//! End-to-end translation and dispatch through the public API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mattermost_bridge::event::{ActionOptions, GenericAction, PlaceholderValue};
use mattermost_bridge::mattermost::action::{ActionDispatcher, PostApi};
use mattermost_bridge::mattermost::client::NewPost;
use mattermost_bridge::mattermost::identity::{IdentityCache, UserLookup, UserProfile};
use mattermost_bridge::mattermost::stream::RawEvent;
use mattermost_bridge::mattermost::translate::Translator;
use mattermost_bridge::mattermost::BridgeError;

const SELF_ID: &str = "bee0";

/// Lookup that refuses everything; translation must rely on seeded entries.
struct NoLookup;

#[async_trait]
impl UserLookup for NoLookup {
    async fn fetch_user(&self, user_id: &str, _etag: &str) -> Result<UserProfile, BridgeError> {
        Err(BridgeError::Resolution {
            user_id: user_id.to_owned(),
            reason: "offline".to_owned(),
        })
    }
}

#[derive(Default)]
struct RecordingApi {
    posts: Mutex<Vec<NewPost>>,
}

#[async_trait]
impl PostApi for RecordingApi {
    async fn create_post(&self, post: &NewPost) -> Result<(), BridgeError> {
        self.posts.lock().expect("posts lock").push(post.clone());
        Ok(())
    }
}

fn message_event(user_id: &str) -> RawEvent {
    let mut raw = RawEvent::new("posted");
    let post = serde_json::json!({
        "id": "p1",
        "channel_id": "c1",
        "user_id": user_id,
        "message": "hi",
    });
    raw.data.insert("post".to_owned(), post.to_string().into());
    raw
}

#[tokio::test]
async fn inbound_message_round_trips_into_a_threaded_reply() {
    let cache = Arc::new(IdentityCache::new(Arc::new(NoLookup)));
    cache
        .insert(UserProfile {
            id: "u1".to_owned(),
            username: "alice".to_owned(),
        })
        .await;
    let translator = Translator::new("mattermost", SELF_ID, cache);

    // Inbound: raw posted event becomes the contractual generic event.
    let event = translator
        .translate(&message_event("u1"))
        .await
        .expect("message event");
    assert_eq!(event.kind, "message");
    let values: Vec<(&str, &str)> = event
        .placeholders
        .iter()
        .map(|p| {
            (
                p.name.as_str(),
                p.value.as_str().expect("string placeholder"),
            )
        })
        .collect();
    assert_eq!(
        values,
        vec![
            ("id", "p1"),
            ("channel_id", "c1"),
            ("user_id", "u1"),
            ("user_name", "alice"),
            ("text", "hi"),
        ]
    );

    // Outbound: the host replies into the thread it just saw.
    let api = Arc::new(RecordingApi::default());
    let dispatcher = ActionDispatcher::new(api.clone());

    let post_id = event
        .placeholder("id")
        .and_then(PlaceholderValue::as_str)
        .expect("post id");
    let channel_id = event
        .placeholder("channel_id")
        .and_then(PlaceholderValue::as_str)
        .expect("channel id");
    let action = GenericAction::new(
        "send",
        ActionOptions::new()
            .with("channel_id", channel_id)
            .with("text", "hello alice")
            .with("parent_id", post_id),
    );
    dispatcher.dispatch(&action).await.expect("send succeeds");

    let posts = api.posts.lock().expect("posts lock");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].channel_id, "c1");
    assert_eq!(posts[0].message, "hello alice");
    assert_eq!(posts[0].root_id, "p1");
}

#[tokio::test]
async fn own_traffic_never_reaches_the_host() {
    let cache = Arc::new(IdentityCache::new(Arc::new(NoLookup)));
    let translator = Translator::new("mattermost", SELF_ID, cache.clone());

    assert!(translator.translate(&message_event(SELF_ID)).await.is_none());

    let mut reaction = RawEvent::new("reaction_added");
    reaction.data.insert(
        "reaction".to_owned(),
        serde_json::json!({
            "user_id": SELF_ID,
            "post_id": "p1",
            "emoji_name": "tada",
            "create_at": 1,
        })
        .to_string()
        .into(),
    );
    assert!(translator.translate(&reaction).await.is_none());

    // Self-suppression happens before enrichment: nothing was cached.
    assert!(cache.is_empty().await);
}
