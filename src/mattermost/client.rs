//! REST client for the Mattermost API (v4).
//!
//! Covers the four calls the bridge needs: the old-format client-config
//! probe, `users/me`, `users/{id}`, and post creation. The client is cheap
//! to clone behind an `Arc` and safe for concurrent use, which the action
//! dispatcher relies on while the dispatch loop is running.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::identity::{UserLookup, UserProfile};
use super::BridgeError;

/// HTTP connect timeout for the reqwest client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for normal operations.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A Mattermost user (subset of fields the bridge uses).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    /// Platform user id.
    #[serde(default)]
    pub id: String,
    /// Login/display username.
    #[serde(default)]
    pub username: String,
}

/// A Mattermost post (subset of fields the bridge uses).
///
/// Also the decode target for the `post` sub-payload carried inside
/// `posted` websocket events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Post {
    /// Post id.
    #[serde(default)]
    pub id: String,
    /// Channel the post belongs to.
    #[serde(default)]
    pub channel_id: String,
    /// Authoring user id.
    #[serde(default)]
    pub user_id: String,
    /// Message text.
    #[serde(default)]
    pub message: String,
}

/// A Mattermost reaction, the decode target for the `reaction` sub-payload
/// of `reaction_added` / `reaction_removed` websocket events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reaction {
    /// Reacting user id.
    #[serde(default)]
    pub user_id: String,
    /// Post the reaction applies to.
    #[serde(default)]
    pub post_id: String,
    /// Emoji name, without colons.
    #[serde(default)]
    pub emoji_name: String,
    /// Creation timestamp in milliseconds.
    #[serde(default)]
    pub create_at: i64,
}

/// Request body for post creation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPost {
    /// Target channel id.
    pub channel_id: String,
    /// Message text.
    pub message: String,
    /// Root post id when replying into a thread; empty for a top-level post.
    pub root_id: String,
}

/// Mattermost API error body.
#[derive(Debug, Clone, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    detailed_error: String,
}

impl ApiError {
    fn describe(&self) -> String {
        if self.detailed_error.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.detailed_error)
        }
    }
}

/// Client for the Mattermost REST API.
pub struct MattermostClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MattermostClient {
    /// Create a new client bound to the given API base URL with a bearer
    /// token attached to every request.
    pub fn new(base_url: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        }
    }

    /// Probe connectivity with the old-format client config call.
    ///
    /// Returns the server's property map; the `Version` key carries the
    /// server version. Used as the lightweight bootstrap probe.
    pub async fn client_config(&self) -> Result<HashMap<String, String>, BridgeError> {
        let url = format!("{}/api/v4/config/client?format=old", self.base_url);
        let resp = self.authorized(self.client.get(&url)).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(BridgeError::Connection(format!(
                "client config probe returned {status}: {}",
                Self::error_detail(resp).await,
            )));
        }
        let props: HashMap<String, String> = resp.json().await?;
        Ok(props)
    }

    /// Fetch the authenticated user's own profile.
    pub async fn get_me(&self, etag: &str) -> Result<User, BridgeError> {
        self.get_user_path("me", etag).await
    }

    /// Fetch a user profile by id.
    pub async fn get_user(&self, user_id: &str, etag: &str) -> Result<User, BridgeError> {
        self.get_user_path(user_id, etag).await
    }

    async fn get_user_path(&self, path: &str, etag: &str) -> Result<User, BridgeError> {
        let url = format!("{}/api/v4/users/{path}", self.base_url);
        let resp = self
            .authorized(self.client.get(&url))
            .header("If-None-Match", etag)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(BridgeError::Connection(format!(
                "user lookup `{path}` returned {status}: {}",
                Self::error_detail(resp).await,
            )));
        }
        let user: User = resp.json().await?;
        debug!(user_id = %user.id, username = %user.username, "fetched user profile");
        Ok(user)
    }

    /// Create a post. Platform rejection becomes a [`BridgeError::Dispatch`]
    /// carrying the server's error message and detail.
    pub async fn create_post(&self, post: &NewPost) -> Result<(), BridgeError> {
        let url = format!("{}/api/v4/posts", self.base_url);
        let resp = self
            .authorized(self.client.post(&url))
            .json(post)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(BridgeError::Dispatch(format!(
                "post creation returned {status}: {}",
                Self::error_detail(resp).await,
            )));
        }
        debug!(channel_id = %post.channel_id, "created post");
        Ok(())
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
    }

    /// Extract the Mattermost error body from a failed response,
    /// best-effort.
    async fn error_detail(resp: reqwest::Response) -> String {
        match resp.json::<ApiError>().await {
            Ok(body) => body.describe(),
            Err(_) => "no error detail".to_owned(),
        }
    }

    /// The API base URL this client is bound to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl UserLookup for MattermostClient {
    async fn fetch_user(&self, user_id: &str, etag: &str) -> Result<UserProfile, BridgeError> {
        match self.get_user(user_id, etag).await {
            Ok(user) => Ok(UserProfile {
                id: user.id,
                username: user.username,
            }),
            Err(e) => Err(BridgeError::Resolution {
                user_id: user_id.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}
