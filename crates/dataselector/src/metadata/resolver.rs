//! Request-scoped metadata resolution.
//!
//! A [`MetadataResolver`] lives for one compile. Each entity prefix and each
//! link hop is fetched from the store at most once, every fetch is bounded by
//! a deadline, and the results are frozen into [`ResolvedMetadata`] before
//! any SQL is generated.

use std::collections::HashMap;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use super::{LinkKey, LinkTypeSettings, MetadataStore, normalize_prefix};
use crate::error::{SelectorError, SelectorResult};

/// Table prefixes are interpolated into table names, so only word characters pass.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static VALID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]*$").expect("valid regex literal"));

/// Memoizing resolver bound to one store for one compile.
pub struct MetadataResolver<'a> {
    store: &'a dyn MetadataStore,
    timeout: Duration,
    resolved: ResolvedMetadata,
}

impl<'a> MetadataResolver<'a> {
    /// Create a resolver; each store call must finish within `timeout`.
    pub fn new(store: &'a dyn MetadataStore, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            resolved: ResolvedMetadata::default(),
        }
    }

    /// Normalized table prefix of an entity.
    pub async fn table_prefix(&mut self, entity_name: &str) -> SelectorResult<String> {
        let key = entity_name.to_lowercase();
        if let Some(prefix) = self.resolved.prefixes.get(&key) {
            return Ok(prefix.clone());
        }

        let raw = with_deadline(self.timeout, self.store.table_prefix(entity_name)).await?;
        let prefix = normalize_prefix(&raw);
        ensure_valid_prefix(&prefix)?;

        debug!(entity = %entity_name, prefix = %prefix, "resolved table prefix");
        self.resolved.prefixes.insert(key, prefix.clone());
        Ok(prefix)
    }

    /// Join strategy for a link hop.
    pub async fn link_settings(&mut self, key: &LinkKey) -> SelectorResult<LinkTypeSettings> {
        if let Some(settings) = self.resolved.links.get(key) {
            return Ok(settings.clone());
        }

        let settings = with_deadline(
            self.timeout,
            self.store
                .link_settings(key.link_type, &key.source, &key.destination),
        )
        .await?;
        ensure_valid_prefix(&settings.dedicated_prefix)?;

        debug!(
            link_type = key.link_type,
            source = %key.source,
            destination = %key.destination,
            resolved_type = settings.link_type,
            use_parent_item_id = settings.use_parent_item_id,
            dedicated_prefix = %settings.dedicated_prefix,
            "resolved link settings"
        );
        self.resolved.links.insert(key.clone(), settings.clone());
        Ok(settings)
    }

    /// Freeze everything resolved so far.
    pub fn into_resolved(self) -> ResolvedMetadata {
        self.resolved
    }
}

async fn with_deadline<T>(
    timeout: Duration,
    lookup: impl Future<Output = SelectorResult<T>>,
) -> SelectorResult<T> {
    tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| SelectorError::MetadataTimeout(timeout))?
}

fn ensure_valid_prefix(prefix: &str) -> SelectorResult<()> {
    if VALID_PREFIX.is_match(prefix) {
        Ok(())
    } else {
        Err(SelectorError::InvalidIdentifier(prefix.to_string()))
    }
}

/// Metadata snapshot consumed by SQL generation.
///
/// Lookups that were never resolved answer with the same permissive defaults
/// a store miss produces.
#[derive(Debug, Clone, Default)]
pub struct ResolvedMetadata {
    prefixes: HashMap<String, String>,
    links: HashMap<LinkKey, LinkTypeSettings>,
}

impl ResolvedMetadata {
    /// Normalized table prefix of an entity, or `""`.
    pub fn table_prefix(&self, entity_name: &str) -> &str {
        self.prefixes
            .get(&entity_name.to_lowercase())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Join strategy for a hop.
    pub fn link_settings(&self, key: &LinkKey) -> LinkTypeSettings {
        self.links
            .get(key)
            .cloned()
            .unwrap_or_else(|| LinkTypeSettings::fallback(key.link_type))
    }

    /// Record an entity prefix (normalized).
    pub fn with_prefix(mut self, entity_name: &str, prefix: &str) -> Self {
        self.prefixes
            .insert(entity_name.to_lowercase(), normalize_prefix(prefix));
        self
    }

    /// Record a link hop.
    pub fn with_link(mut self, key: LinkKey, settings: LinkTypeSettings) -> Self {
        self.links.insert(key, settings);
        self
    }
}
