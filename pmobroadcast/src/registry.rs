//! # Channel Registry
//!
//! The registry holds the channels a server exposes. It is an ordinary
//! value handed to request handlers rather than a process-wide singleton,
//! so independent registries can coexist (in tests, for instance).
//!
//! Channels are kept in registration order and looked up by linear scan;
//! a registry holds a handful of channels.

use crate::channel::{Channel, ChannelBuilder, ChannelSummary};
use crate::config::BroadcastConfig;
use crate::error::Result;
use crate::store::ManifestStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Registre des canaux de diffusion
///
/// Cloning the registry shares the underlying set of channels.
///
/// ```ignore
/// let registry = ChannelRegistry::new(Arc::new(FsManifestStore::new("hls-data")));
/// registry
///     .create_channel(
///         Channel::builder()
///             .source("groovy-set.m3u8")
///             .mode(ChannelMode::Static)
///             .color("green"),
///     )
///     .await?;
///
/// for summary in registry.list_streamable().await {
///     println!("{} ({})", summary.source, summary.color);
/// }
/// ```
#[derive(Clone)]
pub struct ChannelRegistry {
    channels: Arc<RwLock<Vec<Channel>>>,
    store: Arc<dyn ManifestStore>,
}

impl ChannelRegistry {
    /// Creates an empty registry whose channels read manifests from `store`.
    pub fn new(store: Arc<dyn ManifestStore>) -> Self {
        Self {
            channels: Arc::new(RwLock::new(Vec::new())),
            store,
        }
    }

    /// Builds every channel declared in `config`.
    ///
    /// Fails on the first invalid entry: a misconfigured channel is never
    /// silently skipped.
    pub async fn from_config(
        config: &BroadcastConfig,
        store: Arc<dyn ManifestStore>,
    ) -> Result<Self> {
        let registry = Self::new(store);
        for (index, entry) in config.channels.iter().enumerate() {
            if let Err(err) = registry
                .create_channel(ChannelBuilder::from_config(entry))
                .await
            {
                tracing::warn!(index, source = ?entry.source, "Invalid channel entry: {err}");
                return Err(err);
            }
        }
        Ok(registry)
    }

    pub fn store(&self) -> &Arc<dyn ManifestStore> {
        &self.store
    }

    /// Builds a channel with the registry's store and registers it.
    pub async fn create_channel(&self, builder: ChannelBuilder) -> Result<Channel> {
        let channel = builder.build(self.store.clone()).await?;
        self.register(channel.clone()).await;
        Ok(channel)
    }

    /// Registers a channel, replacing any channel with the same id.
    pub async fn register(&self, channel: Channel) {
        let mut channels = self.channels.write().await;

        tracing::info!(
            channel = %channel.id(),
            color = %channel.color(),
            "Registering channel"
        );

        match channels.iter_mut().find(|c| c.id() == channel.id()) {
            Some(existing) => *existing = channel,
            None => channels.push(channel),
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Channel> {
        let channels = self.channels.read().await;
        channels.iter().find(|c| c.id() == id).cloned()
    }

    /// Channel currently playing `source`.
    pub async fn find_by_source(&self, source: &str) -> Option<Channel> {
        for channel in self.list_all().await {
            if channel.source().await == source {
                return Some(channel);
            }
        }
        None
    }

    pub async fn list_all(&self) -> Vec<Channel> {
        self.channels.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.channels.read().await.iter().any(|c| c.id() == id)
    }

    /// Removes a channel; returns `false` if it was not registered.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|c| c.id() != id);

        let removed = channels.len() != before;
        if removed {
            tracing::info!(channel = %id, "Removed channel");
        }
        removed
    }

    /// Summaries of the channels that can be tuned into right now.
    ///
    /// Expired static channels are hidden until they are reset.
    pub async fn list_streamable(&self) -> Vec<ChannelSummary> {
        let mut summaries = Vec::new();
        for channel in self.list_all().await {
            if !channel.is_expired().await {
                summaries.push(channel.summary().await);
            }
        }
        summaries
    }

    /// Resets every expired channel, returning how many were reset.
    ///
    /// Only needed for channels built without automatic expiry. A channel
    /// that started a new cycle since it expired is left alone.
    pub async fn reap_expired(&self) -> usize {
        let mut reaped = 0;
        for channel in self.list_all().await {
            if channel.reset_if_expired().await {
                reaped += 1;
            }
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelMode;
    use crate::color::ChannelColor;
    use crate::error::Error;
    use crate::store::MemoryManifestStore;
    use std::time::Duration;

    async fn registry() -> ChannelRegistry {
        let store = Arc::new(MemoryManifestStore::new());
        store.insert("a.m3u8", "#EXTINF:10,\na.ts\n").await;
        store.insert("b.m3u8", "#EXTINF:3,\nb.ts\n").await;
        store.insert("c.m3u8", "#EXTINF:3,\nc.ts\n").await;
        ChannelRegistry::new(store)
    }

    fn builder(source: &str, color: ChannelColor) -> ChannelBuilder {
        Channel::builder()
            .source(source)
            .mode(ChannelMode::Static)
            .color_tag(color)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry().await;
        let channel = registry
            .create_channel(builder("a.m3u8", ChannelColor::Green))
            .await
            .unwrap();

        assert_eq!(registry.count().await, 1);
        assert!(registry.contains(channel.id()).await);
        let found = registry.get(channel.id()).await.unwrap();
        assert_eq!(found.color(), ChannelColor::Green);
    }

    #[tokio::test]
    async fn test_failed_creation_registers_nothing() {
        let registry = registry().await;
        let err = registry
            .create_channel(Channel::builder().source("a.m3u8").color("green"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingMode));
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_find_by_source_follows_rotation() {
        let registry = registry().await;
        let channel = registry
            .create_channel(builder("a.m3u8", ChannelColor::Red))
            .await
            .unwrap();

        assert!(registry.find_by_source("b.m3u8").await.is_none());
        channel.reset(Some("b.m3u8")).await.unwrap();

        assert!(registry.find_by_source("a.m3u8").await.is_none());
        let found = registry.find_by_source("b.m3u8").await.unwrap();
        assert_eq!(found.id(), channel.id());
    }

    #[tokio::test]
    async fn test_register_replaces_same_id() {
        let registry = registry().await;
        let channel = registry
            .create_channel(builder("a.m3u8", ChannelColor::Red))
            .await
            .unwrap();

        registry.register(channel.clone()).await;
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = registry().await;
        let channel = registry
            .create_channel(builder("a.m3u8", ChannelColor::Red))
            .await
            .unwrap();

        assert!(registry.remove(channel.id()).await);
        assert!(!registry.contains(channel.id()).await);
        assert!(!registry.remove(channel.id()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_channels_are_hidden_until_reaped() {
        let registry = registry().await;
        let long = registry
            .create_channel(builder("a.m3u8", ChannelColor::Green))
            .await
            .unwrap();
        let short = registry
            .create_channel(builder("b.m3u8", ChannelColor::Blue).auto_expire(false))
            .await
            .unwrap();
        let idle = registry
            .create_channel(builder("c.m3u8", ChannelColor::Yellow))
            .await
            .unwrap();

        long.ensure_broadcasting().await;
        short.ensure_broadcasting().await;
        assert_eq!(registry.list_streamable().await.len(), 3);

        tokio::time::advance(Duration::from_secs(4)).await;

        let listed: Vec<Uuid> = registry
            .list_streamable()
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![long.id(), idle.id()]);

        assert_eq!(registry.reap_expired().await, 1);
        assert!(!short.is_broadcasting().await);
        assert_eq!(registry.list_streamable().await.len(), 3);
        assert_eq!(registry.reap_expired().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reap_never_clears_a_restarted_cycle() {
        let registry = registry().await;
        let channel = registry
            .create_channel(builder("b.m3u8", ChannelColor::Red).auto_expire(false))
            .await
            .unwrap();

        channel.ensure_broadcasting().await;
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(channel.is_expired().await);

        // a listener restarts the line-up before the reaper gets to it
        channel.reset(None).await.unwrap();
        assert!(channel.ensure_broadcasting().await);

        assert_eq!(registry.reap_expired().await, 0);
        assert!(channel.is_broadcasting().await);
        assert_eq!(channel.current_cycle().await.unwrap().number, 2);
    }

    #[tokio::test]
    async fn test_from_config() {
        let store = Arc::new(MemoryManifestStore::new());
        store.insert("a.m3u8", "#EXTINF:10,\na.ts\n").await;

        let config = BroadcastConfig::from_yaml_str(
            "channels:\n  - source: a.m3u8\n    mode: static\n    color: green\n    ibeacon_minor: 1\n  - source: live.m3u8\n    mode: livestream\n    color: red\n",
        )
        .unwrap();
        let registry = ChannelRegistry::from_config(&config, store.clone())
            .await
            .unwrap();

        let summaries = registry.list_streamable().await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].ibeacon_minor, Some(1));
        assert_eq!(summaries[1].mode, ChannelMode::Livestream);

        let bad = BroadcastConfig::from_yaml_str(
            "channels:\n  - source: a.m3u8\n    mode: static\n    color: purple\n",
        )
        .unwrap();
        let err = ChannelRegistry::from_config(&bad, store).await.err().unwrap();
        assert!(matches!(err, Error::InvalidColor(_)));
    }
}
