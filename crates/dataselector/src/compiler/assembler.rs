//! Query assembly.
//!
//! [`SelectorCompiler`] is the entry point: it short-circuits literal and
//! empty requests, resolves every metadata lookup the tree needs, then
//! assembles the SELECT statement from the main node and the join graph.

use std::sync::Arc;
use std::time::Duration;

use sea_query::{Alias, Expr, ExprTrait, MysqlQueryBuilder, Query, SimpleExpr};
use tracing::{debug, warn};

use super::joins::{JoinGraphBuilder, Lookup, plan_lookups};
use super::path::IterationPath;
use super::projector::project;
use super::sql::{Limit, any_of, column, comparison};
use crate::error::SelectorResult;
use crate::metadata::{MetadataResolver, MetadataStore, ResolvedMetadata};
use crate::selector::{Selector, SelectorRequest};

/// Default deadline for a single metadata lookup.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Compiles selector requests into MySQL SELECT statements.
#[derive(Clone)]
pub struct SelectorCompiler {
    store: Arc<dyn MetadataStore>,
    timeout: Duration,
}

impl SelectorCompiler {
    /// Create a compiler reading metadata from `store`.
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    /// Set the per-lookup metadata deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compile a request.
    ///
    /// Returns the literal query untouched when one is given, an empty string
    /// when there is nothing to query, and the generated SQL otherwise.
    pub async fn compile(&self, request: &SelectorRequest) -> SelectorResult<String> {
        if let Some(query) = request.literal_query() {
            debug!("passing literal query through");
            return Ok(query.to_string());
        }

        let empty = Selector::default();
        let selector = request.selector.as_ref().unwrap_or(&empty);
        if selector.is_empty() && request.entity_type_filter().is_empty() {
            debug!("selector is empty; nothing to query");
            return Ok(String::new());
        }

        let metadata = self.resolve_metadata(selector).await?;
        let sql = assemble(selector, request, &metadata)?;

        debug!(
            entity = %selector.main.entity_name,
            length = sql.len(),
            "compiled selector"
        );
        Ok(sql)
    }

    /// Fetch every prefix and link hop the selector needs, once each.
    async fn resolve_metadata(&self, selector: &Selector) -> SelectorResult<ResolvedMetadata> {
        let lookups = plan_lookups(selector)?;
        let mut resolver = MetadataResolver::new(self.store.as_ref(), self.timeout);

        for lookup in &lookups {
            match lookup {
                Lookup::TablePrefix(entity) => {
                    resolver.table_prefix(entity).await?;
                }
                Lookup::Link(key) => {
                    resolver.link_settings(key).await?;
                }
            }
        }

        Ok(resolver.into_resolved())
    }
}

/// Assemble the statement for `selector` from already-resolved metadata.
///
/// The statement is built with SeaQuery and rendered for MySQL; a valid
/// limit is appended after rendering.
pub fn assemble(
    selector: &Selector,
    request: &SelectorRequest,
    metadata: &ResolvedMetadata,
) -> SelectorResult<String> {
    let main = &selector.main;
    let root = IterationPath::root();
    let main_alias = root.item_alias();
    let main_prefix = metadata.table_prefix(&main.entity_name);

    let main_projection = project(main, &root, main_prefix);
    let nodes = JoinGraphBuilder::new(metadata).build(
        selector.root_connections(),
        &main.entity_name,
        &root,
    )?;

    let mut query = Query::select();
    for item in main_projection
        .select
        .iter()
        .chain(nodes.iter().flat_map(|node| &node.projection.select))
    {
        query.expr_as(item.expr.clone(), Alias::new(&item.alias));
    }
    query.from_as(
        Alias::new(format!("{main_prefix}wiser_item")),
        Alias::new(&main_alias),
    );

    for join in &main_projection.joins {
        join.apply(&mut query);
    }
    for node in &nodes {
        for join in node.joins.iter().chain(&node.projection.joins) {
            join.apply(&mut query);
        }
    }

    if !main.entity_name.trim().is_empty() {
        query.and_where(column(&main_alias, "entity_type").eq(main.entity_name.as_str()));
    }
    let entity_types = request.entity_type_filter();
    if !entity_types.is_empty() {
        query.and_where(column(&main_alias, "entity_type").is_in(entity_types));
    }
    for predicate in main_projection
        .predicates
        .iter()
        .chain(nodes.iter().flat_map(|node| &node.projection.predicates))
    {
        query.and_where(predicate.clone());
    }

    for group in having_groups(selector) {
        query.and_having(group);
    }

    let mut sql = query.to_string(MysqlQueryBuilder);

    if let Some(raw) = request.limit.as_deref() {
        match Limit::parse(raw) {
            Some(limit) => {
                sql.push(' ');
                sql.push_str(&limit.to_string());
            }
            None if raw.trim().is_empty() => {}
            None => warn!(limit = %raw, "ignoring malformed limit"),
        }
    }

    Ok(sql)
}

/// HAVING groups: rows compare output aliases, OR within a scope.
fn having_groups(selector: &Selector) -> Vec<SimpleExpr> {
    selector
        .having
        .iter()
        .filter_map(|scope| {
            let predicates = scope
                .scope_rows
                .iter()
                .map(|row| {
                    let alias: SimpleExpr = Expr::col(Alias::new(&row.key)).into();
                    comparison(alias, row.operator, &row.value)
                })
                .collect();
            any_of(predicates)
        })
        .collect()
}
