//! Dispatch of generic actions to the platform.
//!
//! Called by the host, potentially concurrently with the inbound dispatch
//! loop; the REST client is safe for that. The recognized action set is
//! closed: `send` creates a post, anything else is reported back as an
//! unsupported-action error rather than aborting the process.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::event::GenericAction;

use super::client::{MattermostClient, NewPost};
use super::BridgeError;

/// The post-creation surface of the platform API.
///
/// Seam for tests; [`MattermostClient`] is the production implementation.
#[async_trait]
pub trait PostApi: Send + Sync {
    /// Submit a post-creation call.
    async fn create_post(&self, post: &NewPost) -> Result<(), BridgeError>;
}

#[async_trait]
impl PostApi for MattermostClient {
    async fn create_post(&self, post: &NewPost) -> Result<(), BridgeError> {
        MattermostClient::create_post(self, post).await
    }
}

/// Maps one generic action to one platform API call.
pub struct ActionDispatcher {
    api: Arc<dyn PostApi>,
}

impl ActionDispatcher {
    /// Create a dispatcher submitting through the given API.
    pub fn new(api: Arc<dyn PostApi>) -> Self {
        Self { api }
    }

    /// Dispatch one action.
    ///
    /// `send` requires `channel_id` and `text`; the optional `parent_id`
    /// becomes the created post's thread root. Platform rejections and
    /// missing options are returned as [`BridgeError::Dispatch`]; an
    /// unrecognized kind is [`BridgeError::UnsupportedAction`].
    pub async fn dispatch(&self, action: &GenericAction) -> Result<(), BridgeError> {
        match action.kind.as_str() {
            "send" => self.send(action).await,
            other => {
                warn!(kind = other, "host issued an unsupported action kind");
                Err(BridgeError::UnsupportedAction(other.to_owned()))
            }
        }
    }

    async fn send(&self, action: &GenericAction) -> Result<(), BridgeError> {
        let channel_id = Self::required_option(action, "channel_id")?;
        let text = Self::required_option(action, "text")?;
        let post = NewPost {
            channel_id: channel_id.to_owned(),
            message: text.to_owned(),
            root_id: action.options.get("parent_id").unwrap_or_default().to_owned(),
        };

        if let Err(e) = self.api.create_post(&post).await {
            error!(channel_id = %post.channel_id, error = %e, "failed to send message");
            return Err(e);
        }
        debug!(channel_id = %post.channel_id, "sent message");
        Ok(())
    }

    fn required_option<'a>(action: &'a GenericAction, name: &str) -> Result<&'a str, BridgeError> {
        action.options.get(name).ok_or_else(|| {
            BridgeError::Dispatch(format!(
                "`{}` action is missing required option `{name}`",
                action.kind
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::event::ActionOptions;

    use super::*;

    /// Records submitted posts; fails when constructed with an error text.
    #[derive(Default)]
    struct RecordingApi {
        posts: Mutex<Vec<NewPost>>,
        reject_with: Option<String>,
    }

    #[async_trait]
    impl PostApi for RecordingApi {
        async fn create_post(&self, post: &NewPost) -> Result<(), BridgeError> {
            self.posts
                .lock()
                .expect("posts lock")
                .push(post.clone());
            match &self.reject_with {
                Some(reason) => Err(BridgeError::Dispatch(reason.clone())),
                None => Ok(()),
            }
        }
    }

    fn send_action(parent_id: Option<&str>) -> GenericAction {
        let mut options = ActionOptions::new()
            .with("channel_id", "c1")
            .with("text", "hello");
        if let Some(parent) = parent_id {
            options.set("parent_id", parent);
        }
        GenericAction::new("send", options)
    }

    #[tokio::test]
    async fn send_without_parent_posts_with_empty_root() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = ActionDispatcher::new(api.clone());

        dispatcher
            .dispatch(&send_action(None))
            .await
            .expect("send succeeds");

        let posts = api.posts.lock().expect("posts lock");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel_id, "c1");
        assert_eq!(posts[0].message, "hello");
        assert_eq!(posts[0].root_id, "");
    }

    #[tokio::test]
    async fn send_with_parent_forwards_it_verbatim() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = ActionDispatcher::new(api.clone());

        dispatcher
            .dispatch(&send_action(Some("p42")))
            .await
            .expect("send succeeds");

        let posts = api.posts.lock().expect("posts lock");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].root_id, "p42");
    }

    #[tokio::test]
    async fn send_missing_required_option_is_a_dispatch_error() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = ActionDispatcher::new(api.clone());

        let action = GenericAction::new("send", ActionOptions::new().with("text", "hello"));
        let err = dispatcher.dispatch(&action).await.expect_err("must fail");
        assert!(matches!(err, BridgeError::Dispatch(_)));
        assert!(api.posts.lock().expect("posts lock").is_empty());
    }

    #[tokio::test]
    async fn platform_rejection_is_surfaced_to_the_caller() {
        let api = Arc::new(RecordingApi {
            posts: Mutex::new(Vec::new()),
            reject_with: Some("channel is archived".to_owned()),
        });
        let dispatcher = ActionDispatcher::new(api.clone());

        let err = dispatcher
            .dispatch(&send_action(None))
            .await
            .expect_err("rejection propagates");
        assert!(matches!(err, BridgeError::Dispatch(_)));
    }

    #[tokio::test]
    async fn unknown_action_kind_is_reported_not_fatal() {
        let api = Arc::new(RecordingApi::default());
        let dispatcher = ActionDispatcher::new(api.clone());

        let action = GenericAction::new("join", ActionOptions::new());
        let err = dispatcher.dispatch(&action).await.expect_err("must fail");
        assert!(matches!(err, BridgeError::UnsupportedAction(kind) if kind == "join"));
        assert!(api.posts.lock().expect("posts lock").is_empty());
    }
}
