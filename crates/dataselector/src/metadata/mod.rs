//! Entity and link metadata.
//!
//! This module provides:
//! - MetadataStore: async lookup contract for table prefixes and link settings
//! - MySqlMetadataStore: reads `wiser_entity` / `wiser_link`
//! - StaticMetadataStore: metadata loaded from YAML or JSON
//! - CachedMetadataStore: cross-request TTL cache around any store
//! - MetadataResolver: request-scoped memoization with a per-lookup deadline

mod cache;
mod memory;
mod mysql;
mod resolver;

use async_trait::async_trait;

use crate::error::SelectorResult;

pub use cache::CachedMetadataStore;
pub use memory::{EntityMetadata, LinkMetadata, StaticMetadata, StaticMetadataStore};
pub use mysql::MySqlMetadataStore;
pub use resolver::{MetadataResolver, ResolvedMetadata};

/// Resolved join strategy for one (link type, source, destination) hop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTypeSettings {
    /// Link type number. Zero when unknown.
    pub link_type: i32,

    /// Join via `parent_item_id` on the item table instead of a link table.
    pub use_parent_item_id: bool,

    /// Prefix of a dedicated link table (`"{type}_"`), or empty.
    pub dedicated_prefix: String,
}

impl LinkTypeSettings {
    /// Build settings from a link metadata row.
    pub fn from_link(link_type: i32, use_parent_item_id: bool, use_dedicated_table: bool) -> Self {
        let dedicated_prefix = if use_dedicated_table && link_type > 0 {
            format!("{link_type}_")
        } else {
            String::new()
        };
        Self {
            link_type,
            use_parent_item_id,
            dedicated_prefix,
        }
    }

    /// Permissive defaults used when no link row matches.
    ///
    /// The resulting SQL joins through the shared link table, which is
    /// syntactically valid but may select nothing if the link is really
    /// stored elsewhere.
    pub fn fallback(link_type: i32) -> Self {
        Self {
            link_type,
            ..Default::default()
        }
    }
}

/// Cache key of a link lookup. Entity names are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKey {
    pub link_type: i32,
    pub source: String,
    pub destination: String,
}

impl LinkKey {
    /// Key for a hop from `source` to `destination`.
    pub fn new(link_type: i32, source: &str, destination: &str) -> Self {
        Self {
            link_type,
            source: source.to_lowercase(),
            destination: destination.to_lowercase(),
        }
    }
}

/// Read-only metadata lookups used by the compiler.
///
/// Implementations must be safe to share between concurrent compiles.
/// A lookup that finds nothing returns the permissive default (empty prefix,
/// [`LinkTypeSettings::fallback`]); only store failures are errors.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Dedicated table prefix of an entity, as configured (not normalized).
    async fn table_prefix(&self, entity_name: &str) -> SelectorResult<String>;

    /// Join strategy for links of `link_type` (any type when `<= 0`) from
    /// `source` items to `destination` items.
    async fn link_settings(
        &self,
        link_type: i32,
        source: &str,
        destination: &str,
    ) -> SelectorResult<LinkTypeSettings>;
}

/// Normalize a table prefix so a non-empty prefix always ends in `_`.
pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix.ends_with('_') {
        prefix.to_string()
    } else {
        format!("{prefix}_")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prefix_appends_underscore() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("  "), "");
        assert_eq!(normalize_prefix("shop"), "shop_");
        assert_eq!(normalize_prefix("shop_"), "shop_");
    }

    #[test]
    fn dedicated_prefix_uses_type_number() {
        let settings = LinkTypeSettings::from_link(5, false, true);
        assert_eq!(settings.dedicated_prefix, "5_");
        let shared = LinkTypeSettings::from_link(5, false, false);
        assert_eq!(shared.dedicated_prefix, "");
    }

    #[test]
    fn link_key_ignores_case() {
        assert_eq!(
            LinkKey::new(1, "Product", "CATEGORY"),
            LinkKey::new(1, "product", "category")
        );
    }
}
