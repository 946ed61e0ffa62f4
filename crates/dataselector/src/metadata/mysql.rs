//! MySQL-backed metadata store.

use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::debug;

use super::{LinkTypeSettings, MetadataStore};
use crate::error::SelectorResult;

/// Reads entity and link metadata from `wiser_entity` and `wiser_link`.
///
/// The pool is shared by every compile that uses this store.
#[derive(Debug, Clone)]
pub struct MySqlMetadataStore {
    pool: MySqlPool,
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    #[sqlx(rename = "type")]
    link_type: i32,
    use_item_parent_id: bool,
    use_dedicated_table: bool,
}

impl MySqlMetadataStore {
    /// Create a store over an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for MySqlMetadataStore {
    async fn table_prefix(&self, entity_name: &str) -> SelectorResult<String> {
        let prefix: Option<Option<String>> = sqlx::query_scalar(
            r#"
            SELECT dedicated_table_prefix
            FROM wiser_entity
            WHERE LOWER(name) = LOWER(?)
              AND dedicated_table_prefix IS NOT NULL
              AND dedicated_table_prefix <> ''
            LIMIT 1
            "#,
        )
        .bind(entity_name)
        .fetch_optional(&self.pool)
        .await?;

        match prefix.flatten() {
            Some(prefix) => Ok(prefix),
            None => {
                debug!(entity = %entity_name, "no table prefix; using shared tables");
                Ok(String::new())
            }
        }
    }

    async fn link_settings(
        &self,
        link_type: i32,
        source: &str,
        destination: &str,
    ) -> SelectorResult<LinkTypeSettings> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT type, use_item_parent_id, use_dedicated_table
            FROM wiser_link
            WHERE LOWER(connected_entity_type) = LOWER(?)
              AND LOWER(destination_entity_type) = LOWER(?)
              AND (? <= 0 OR type = ?)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(source)
        .bind(destination)
        .bind(link_type)
        .bind(link_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => LinkTypeSettings::from_link(
                row.link_type,
                row.use_item_parent_id,
                row.use_dedicated_table,
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
