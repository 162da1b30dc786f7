//! Per-user favorite posts.
//!
//! Favorites live under `users/{user_id}/favorites/{post_id}`. A followed user
//! has a `watch` channel carrying the current set, ordered by post id, so callers
//! can follow changes the way a realtime-database listener would. Channels are
//! dropped once their last receiver goes away.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::StoreError;

/// What is stored for each favorite; the post id is the key
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FavoriteEntry {
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl FavoriteEntry {
    pub fn now(text: impl Into<String>, video_url: Option<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            video_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FavoritePost {
    pub id: String,
    #[serde(flatten)]
    pub entry: FavoriteEntry,
}

pub type FavoriteSet = Vec<FavoritePost>;

#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Store `entry` under `post_id`, replacing any previous value
    async fn write(&self, user_id: &str, post_id: &str, entry: FavoriteEntry) -> Result<(), StoreError>;

    /// Remove `post_id`; removing an absent favorite is not an error
    async fn delete(&self, user_id: &str, post_id: &str) -> Result<(), StoreError>;

    /// Follow the user's current favorite set
    async fn subscribe(&self, user_id: &str) -> Result<watch::Receiver<FavoriteSet>, StoreError>;
}

/// Realtime-database keys may not be empty or contain `/ . # $ [ ]`.
///
/// Keys become REST path segments, so `? % \`, whitespace and control
/// characters are refused as well.
pub fn validate_key(what: &'static str, key: &str) -> Result<(), StoreError> {
    const FORBIDDEN: &[char] = &['/', '.', '#', '$', '[', ']', '?', '%', '\\'];
    let unsafe_char = |c: char| FORBIDDEN.contains(&c) || c.is_whitespace() || c.is_control();
    if key.is_empty() || key.contains(unsafe_char) {
        return Err(StoreError::InvalidKey {
            what,
            key: key.to_string(),
        });
    }
    Ok(())
}

fn to_set(entries: BTreeMap<String, FavoriteEntry>) -> FavoriteSet {
    entries
        .into_iter()
        .map(|(id, entry)| FavoritePost { id, entry })
        .collect()
}

/// Per-user watch channels shared by the store implementations
#[derive(Default)]
struct Channels {
    senders: Mutex<HashMap<String, watch::Sender<FavoriteSet>>>,
}

impl Channels {
    /// Lock the map, dropping channels nobody follows any more
    fn live(&self) -> MutexGuard<'_, HashMap<String, watch::Sender<FavoriteSet>>> {
        let mut senders = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        senders.retain(|_, sender| sender.receiver_count() > 0);
        senders
    }

    /// Follow the user's channel, opening it with `current` if no one else does
    fn subscribe<F>(&self, user_id: &str, current: F) -> watch::Receiver<FavoriteSet>
    where
        F: FnOnce() -> FavoriteSet,
    {
        self.live()
            .entry(user_id.to_string())
            .or_insert_with(|| watch::Sender::new(current()))
            .subscribe()
    }

    fn publish(&self, user_id: &str, set: FavoriteSet) {
        if let Some(sender) = self.live().get(user_id) {
            sender.send_replace(set);
        }
    }
}

/// Process-local favorites
#[derive(Default)]
pub struct MemoryFavorites {
    entries: Mutex<HashMap<String, BTreeMap<String, FavoriteEntry>>>,
    channels: Channels,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, user_id: &str, f: F)
    where
        F: FnOnce(&mut BTreeMap<String, FavoriteEntry>),
    {
        // Publish under the lock so subscribers never see snapshots out of order
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let user = entries.entry(user_id.to_string()).or_default();
        f(user);
        self.channels.publish(user_id, to_set(user.clone()));
    }
}

#[async_trait]
impl FavoritesStore for MemoryFavorites {
    async fn write(&self, user_id: &str, post_id: &str, entry: FavoriteEntry) -> Result<(), StoreError> {
        validate_key("user", user_id)?;
        validate_key("post", post_id)?;
        self.update(user_id, |set| {
            set.insert(post_id.to_string(), entry);
        });
        Ok(())
    }

    async fn delete(&self, user_id: &str, post_id: &str) -> Result<(), StoreError> {
        validate_key("user", user_id)?;
        validate_key("post", post_id)?;
        self.update(user_id, |set| {
            set.remove(post_id);
        });
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> Result<watch::Receiver<FavoriteSet>, StoreError> {
        validate_key("user", user_id)?;
        // Hold the entries lock so no update lands between the read and the subscribe
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let current = || entries.get(user_id).cloned().map(to_set).unwrap_or_default();
        Ok(self.channels.subscribe(user_id, current))
    }
}

/// Favorites in a Firebase Realtime Database, through its REST API
pub struct RealtimeDbFavorites {
    http: reqwest::Client,
    base_url: String,
    auth: Option<String>,
    channels: Channels,
}

impl RealtimeDbFavorites {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            channels: Channels::default(),
        }
    }

    fn favorites_url(&self, user_id: &str) -> String {
        format!("{}/users/{user_id}/favorites.json", self.base_url)
    }

    fn favorite_url(&self, user_id: &str, post_id: &str) -> String {
        format!("{}/users/{user_id}/favorites/{post_id}.json", self.base_url)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.request(method, url);
        match &self.auth {
            Some(token) => req.query(&[("auth", token.as_str())]),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        Ok(resp)
    }

    /// Re-read the user's favorites and push them to subscribers
    async fn refresh(&self, user_id: &str) -> Result<FavoriteSet, StoreError> {
        let url = self.favorites_url(user_id);
        debug!("Reading favorites from {url}");
        let resp = self.send(self.request(reqwest::Method::GET, &url)).await?;
        // An empty location reads back as `null`
        let entries: Option<BTreeMap<String, FavoriteEntry>> = resp.json().await?;
        let set = to_set(entries.unwrap_or_default());
        self.channels.publish(user_id, set.clone());
        Ok(set)
    }

    /// The change is already stored; a failed read-back only leaves subscribers stale
    async fn refresh_after_change(&self, user_id: &str) {
        if let Err(e) = self.refresh(user_id).await {
            warn!("Favorites for {user_id} changed but could not be re-read: {e}");
        }
    }
}

#[async_trait]
impl FavoritesStore for RealtimeDbFavorites {
    async fn write(&self, user_id: &str, post_id: &str, entry: FavoriteEntry) -> Result<(), StoreError> {
        validate_key("user", user_id)?;
        validate_key("post", post_id)?;
        let url = self.favorite_url(user_id, post_id);
        debug!("Writing favorite to {url}");
        self.send(self.request(reqwest::Method::PUT, &url).json(&entry)).await?;
        self.refresh_after_change(user_id).await;
        Ok(())
    }

    async fn delete(&self, user_id: &str, post_id: &str) -> Result<(), StoreError> {
        validate_key("user", user_id)?;
        validate_key("post", post_id)?;
        let url = self.favorite_url(user_id, post_id);
        debug!("Deleting favorite at {url}");
        self.send(self.request(reqwest::Method::DELETE, &url)).await?;
        self.refresh_after_change(user_id).await;
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> Result<watch::Receiver<FavoriteSet>, StoreError> {
        validate_key("user", user_id)?;
        let receiver = self.channels.subscribe(user_id, Vec::new);
        self.refresh(user_id).await?;
        Ok(receiver)
    }
}
