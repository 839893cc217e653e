//! Cache-aside store for user-id → profile lookups.
//!
//! Inbound translation resolves a display name for every user id it sees.
//! The first reference to an id triggers one fetch against the platform;
//! every later reference is served from memory. The cache grows
//! monotonically and never evicts, so a username is frozen for the lifetime
//! of the session. Deliberate trade-off, not a bug.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};
use uuid::Uuid;

use super::BridgeError;

/// A resolved user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Platform user id.
    pub id: String,
    /// Login/display username. Empty when resolution failed.
    pub username: String,
}

/// Fetches a user profile by id from the platform.
///
/// Implemented by the REST client; test code substitutes counting mocks.
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Fetch the profile for `user_id`. `etag` is a per-call cache-busting
    /// token forwarded as the `If-None-Match` header.
    async fn fetch_user(&self, user_id: &str, etag: &str) -> Result<UserProfile, BridgeError>;
}

/// Memoizing user-profile cache.
///
/// Concurrent resolutions of the same uncached id may race and issue
/// duplicate fetches; the last write wins, which is harmless beyond the
/// redundant network call.
pub struct IdentityCache {
    lookup: Arc<dyn UserLookup>,
    cache: RwLock<HashMap<String, UserProfile>>,
}

impl IdentityCache {
    /// Create an empty cache backed by the given lookup.
    pub fn new(lookup: Arc<dyn UserLookup>) -> Self {
        Self {
            lookup,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a user profile, fetching and memoizing on first reference.
    ///
    /// A fetch error is a soft failure: it is logged and a default profile
    /// (id filled in, empty username) is returned and cached, so inbound
    /// processing never aborts on a failed lookup.
    pub async fn resolve(&self, user_id: &str) -> UserProfile {
        if let Some(profile) = self.cache.read().await.get(user_id) {
            return profile.clone();
        }

        let etag = Uuid::new_v4().to_string();
        let profile = match self.lookup.fetch_user(user_id, &etag).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(user_id, error = %e, "user profile fetch failed, using default profile");
                UserProfile {
                    id: user_id.to_owned(),
                    username: String::new(),
                }
            }
        };

        debug!(user_id, username = %profile.username, "caching user profile");
        self.cache
            .write()
            .await
            .insert(user_id.to_owned(), profile.clone());
        profile
    }

    /// Insert a profile directly, bypassing the lookup. Used by hosts that
    /// already know a mapping and by tests.
    pub async fn insert(&self, profile: UserProfile) {
        self.cache.write().await.insert(profile.id.clone(), profile);
    }

    /// Number of cached profiles.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}
