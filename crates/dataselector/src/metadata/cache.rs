//! Cross-request metadata cache.
//!
//! Wraps any [`MetadataStore`] with in-process Moka caches so metadata
//! shared by many compiles is fetched once per TTL. Errors are never cached.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::{LinkKey, LinkTypeSettings, MetadataStore};
use crate::error::SelectorResult;

/// Maximum cached entries per lookup kind.
const MAX_CAPACITY: u64 = 10_000;

/// TTL-cached [`MetadataStore`].
pub struct CachedMetadataStore<S> {
    inner: S,
    prefixes: Cache<String, String>,
    links: Cache<LinkKey, LinkTypeSettings>,
}

impl<S: MetadataStore> CachedMetadataStore<S> {
    /// Cache lookups of `inner` for `ttl`.
    pub fn new(inner: S, ttl: Duration) -> Self {
        let prefixes = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .time_to_live(ttl)
            .build();
        let links = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            prefixes,
            links,
        }
    }

    /// Drop every cached entry, e.g. after metadata tables changed.
    pub fn invalidate_all(&self) {
        self.prefixes.invalidate_all();
        self.links.invalidate_all();
    }
}

#[async_trait]
impl<S: MetadataStore> MetadataStore for CachedMetadataStore<S> {
    async fn table_prefix(&self, entity_name: &str) -> SelectorResult<String> {
        let key = entity_name.to_lowercase();
        if let Some(prefix) = self.prefixes.get(&key).await {
            debug!(entity = %entity_name, "metadata cache hit");
            return Ok(prefix);
        }

        let prefix = self.inner.table_prefix(entity_name).await?;
        self.prefixes.insert(key, prefix.clone()).await;
        Ok(prefix)
    }

    async fn link_settings(
        &self,
        link_type: i32,
        source: &str,
        destination: &str,
    ) -> SelectorResult<LinkTypeSettings> {
        let key = LinkKey::new(link_type, source, destination);
        if let Some(settings) = self.links.get(&key).await {
            debug!(link_type, source, destination, "metadata cache hit");
            return Ok(settings);
        }

        let settings = self
            .inner
            .link_settings(link_type, source, destination)
            .await?;
        self.links.insert(key, settings.clone()).await;
        Ok(settings)
    }
}
