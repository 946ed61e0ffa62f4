//! Static metadata store.
//!
//! Holds entity and link metadata in memory, loaded from a YAML or JSON file.
//! Used by the CLI's `--metadata` option and by tests in place of MySQL.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LinkTypeSettings, MetadataStore};
use crate::error::{SelectorError, SelectorResult};

/// File format of static metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticMetadata {
    #[serde(default)]
    pub entities: Vec<EntityMetadata>,

    #[serde(default)]
    pub links: Vec<LinkMetadata>,
}

/// One `wiser_entity` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,

    #[serde(default)]
    pub dedicated_table_prefix: String,
}

/// One `wiser_link` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkMetadata {
    #[serde(rename = "type")]
    pub link_type: i32,

    /// Entity type on the `item_id` side.
    pub source_entity_type: String,

    /// Entity type on the `destination_item_id` side.
    pub destination_entity_type: String,

    #[serde(default)]
    pub use_item_parent_id: bool,

    #[serde(default)]
    pub use_dedicated_table: bool,
}

/// In-memory [`MetadataStore`].
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataStore {
    metadata: StaticMetadata,
}

impl StaticMetadataStore {
    /// Create a store from parsed metadata.
    pub fn new(metadata: StaticMetadata) -> Self {
        Self { metadata }
    }

    /// Parse YAML metadata.
    pub fn from_yaml_str(yaml: &str) -> SelectorResult<Self> {
        let metadata = serde_yml::from_str(yaml)
            .map_err(|e| SelectorError::MetadataFile(format!("invalid YAML: {e}")))?;
        Ok(Self::new(metadata))
    }

    /// Parse JSON metadata.
    pub fn from_json_str(json: &str) -> SelectorResult<Self> {
        let metadata = serde_json::from_str(json)
            .map_err(|e| SelectorError::MetadataFile(format!("invalid JSON: {e}")))?;
        Ok(Self::new(metadata))
    }

    /// Load metadata from a file; `.json` files are read as JSON, anything else as YAML.
    pub async fn load(path: &Path) -> SelectorResult<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            SelectorError::MetadataFile(format!("failed to read {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
    }

    /// Add an entity with a dedicated prefix.
    pub fn with_entity(mut self, name: &str, dedicated_table_prefix: &str) -> Self {
        self.metadata.entities.push(EntityMetadata {
            name: name.to_string(),
            dedicated_table_prefix: dedicated_table_prefix.to_string(),
        });
        self
    }

    /// Add a link row.
    pub fn with_link(mut self, link: LinkMetadata) -> Self {
        self.metadata.links.push(link);
        self
    }
}

#[async_trait]
impl MetadataStore for StaticMetadataStore {
    async fn table_prefix(&self, entity_name: &str) -> SelectorResult<String> {
        let prefix = self
            .metadata
            .entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(entity_name))
            .map(|e| e.dedicated_table_prefix.clone())
            .unwrap_or_default();
        if prefix.trim().is_empty() {
            debug!(entity = %entity_name, "no table prefix; using shared tables");
        }
        Ok(prefix)
    }

    async fn link_settings(
        &self,
        link_type: i32,
        source: &str,
        destination: &str,
    ) -> SelectorResult<LinkTypeSettings> {
        let found = self.metadata.links.iter().find(|l| {
            l.source_entity_type.eq_ignore_ascii_case(source)
                && l.destination_entity_type.eq_ignore_ascii_case(destination)
                && (link_type <= 0 || l.link_type == link_type)
        });

        Ok(match found {
            Some(l) => LinkTypeSettings::from_link(
                l.link_type,
                l.use_item_parent_id,
                l.use_dedicated_table,
            ),
            None => {
                debug!(
                    link_type,
                    source,
                    destination,
                    "no link metadata; using permissive defaults"
                );
                LinkTypeSettings::fallback(link_type)
            }
        })
    }
}
