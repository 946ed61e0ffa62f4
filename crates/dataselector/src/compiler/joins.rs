//! Join graph construction.
//!
//! Walks the connection tree depth-first in declaration order. Each row
//! becomes one node: the joins that reach its item table from the previous
//! node, plus its field projection. Sibling counters are threaded through
//! return values; paths are extended by value.

use sea_query::{ExprTrait, SimpleExpr};

use super::path::IterationPath;
use super::projector::{Projection, project};
use super::sql::{JoinClause, column, join_type};
use crate::error::{SelectorError, SelectorResult};
use crate::metadata::{LinkKey, ResolvedMetadata};
use crate::selector::{Connection, ConnectionRow, Selector};

/// Maximum nesting depth of connections below the main node.
pub const MAX_CONNECTION_DEPTH: usize = 16;

/// Traversal direction of a hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The row is a child of the previous node.
    Down,
    /// The row is the parent of the previous node.
    Up,
}

impl Direction {
    pub fn of(row: &ConnectionRow) -> Self {
        if row.modes.up { Self::Up } else { Self::Down }
    }
}

/// Link lookup for the hop from `previous_entity` to `row`.
///
/// Links run from the child (source, `item_id`) to the parent (destination,
/// `destination_item_id`), so an upward hop swaps the roles.
pub fn hop_key(previous_entity: &str, row: &ConnectionRow) -> LinkKey {
    match Direction::of(row) {
        Direction::Down => LinkKey::new(row.type_number, &row.entity_name, previous_entity),
        Direction::Up => LinkKey::new(row.type_number, previous_entity, &row.entity_name),
    }
}

/// A metadata lookup a selector needs before SQL can be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    TablePrefix(String),
    Link(LinkKey),
}

/// Every lookup needed to compile `selector`, in traversal order.
pub fn plan_lookups(selector: &Selector) -> SelectorResult<Vec<Lookup>> {
    let mut lookups = Vec::new();
    if !selector.main.entity_name.trim().is_empty() {
        lookups.push(Lookup::TablePrefix(selector.main.entity_name.clone()));
    }
    for connection in selector.root_connections() {
        plan_group(connection, &selector.main.entity_name, 1, &mut lookups)?;
    }
    Ok(lookups)
}

fn plan_group(
    connection: &Connection,
    previous_entity: &str,
    depth: usize,
    lookups: &mut Vec<Lookup>,
) -> SelectorResult<()> {
    if depth > MAX_CONNECTION_DEPTH {
        return Err(SelectorError::TooDeep {
            depth: MAX_CONNECTION_DEPTH,
        });
    }
    for row in &connection.connection_rows {
        lookups.push(Lookup::TablePrefix(row.entity_name.clone()));
        lookups.push(Lookup::Link(hop_key(previous_entity, row)));
        for nested in &row.connections {
            plan_group(nested, &row.entity_name, depth + 1, lookups)?;
        }
    }
    Ok(())
}

/// Joins and projection of one connection node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFragment {
    pub path: IterationPath,
    pub entity_name: String,
    /// Joins reaching this node's item table, in order.
    pub joins: Vec<JoinClause>,
    pub projection: Projection,
}

impl NodeFragment {
    /// Item-table alias of this node.
    pub fn alias(&self) -> String {
        self.path.item_alias()
    }
}

/// Builds node fragments from resolved metadata. Pure; no I/O.
pub struct JoinGraphBuilder<'a> {
    metadata: &'a ResolvedMetadata,
}

impl<'a> JoinGraphBuilder<'a> {
    pub fn new(metadata: &'a ResolvedMetadata) -> Self {
        Self { metadata }
    }

    /// Fragments for `connections` below the node at `parent`, pre-order.
    pub fn build<'c>(
        &self,
        connections: impl IntoIterator<Item = &'c Connection>,
        previous_entity: &str,
        parent: &IterationPath,
    ) -> SelectorResult<Vec<NodeFragment>> {
        let mut fragments = Vec::new();
        let mut counter = 1;
        for connection in connections {
            if parent.depth() >= MAX_CONNECTION_DEPTH {
                return Err(SelectorError::TooDeep {
                    depth: MAX_CONNECTION_DEPTH,
                });
            }
            let (group, next) = self.build_group(connection, previous_entity, parent, counter)?;
            fragments.extend(group);
            counter = next;
        }
        Ok(fragments)
    }

    /// Fragments for one group; returns the counter for the next sibling.
    fn build_group(
        &self,
        connection: &Connection,
        previous_entity: &str,
        parent: &IterationPath,
        first: u32,
    ) -> SelectorResult<(Vec<NodeFragment>, u32)> {
        let mut fragments = Vec::new();
        let mut counter = first;
        for row in &connection.connection_rows {
            let path = parent.child(counter);
            fragments.push(self.build_node(row, previous_entity, &path));
            fragments.extend(self.build(&row.connections, &row.entity_name, &path)?);
            counter += 1;
        }
        Ok((fragments, counter))
    }

    fn build_node(
        &self,
        row: &ConnectionRow,
        previous_entity: &str,
        path: &IterationPath,
    ) -> NodeFragment {
        let node = path.item_alias();
        let previous = path
            .parent()
            .unwrap_or_else(IterationPath::root)
            .item_alias();
        let direction = Direction::of(row);
        let settings = self.metadata.link_settings(&hop_key(previous_entity, row));
        let prefix = self.metadata.table_prefix(&row.entity_name);

        let item_table = format!("{prefix}wiser_item");
        let join = join_type(row.modes.optional);
        let with_entity_check = |on: SimpleExpr| {
            if row.entity_name.trim().is_empty() {
                on
            } else {
                on.and(column(&node, "entity_type").eq(row.entity_name.as_str()))
            }
        };

        let joins = if settings.use_parent_item_id {
            let on = match direction {
                Direction::Down => column(&node, "parent_item_id").eq(column(&previous, "id")),
                Direction::Up => column(&node, "id").eq(column(&previous, "parent_item_id")),
            };
            vec![JoinClause::new(join, item_table, &node, with_entity_check(on))]
        } else {
            let link = path.link_alias();
            let link_table = format!("{}wiser_itemlink", settings.dedicated_prefix);
            let (previous_column, node_column) = match direction {
                Direction::Down => ("destination_item_id", "item_id"),
                Direction::Up => ("item_id", "destination_item_id"),
            };

            let mut link_on = column(&link, previous_column).eq(column(&previous, "id"));
            if settings.link_type > 0 {
                link_on = link_on.and(column(&link, "type").eq(settings.link_type));
            }
            let node_on = column(&node, "id").eq(column(&link, node_column));

            vec![
                JoinClause::new(join, link_table, &link, link_on),
                JoinClause::new(join, item_table, &node, with_entity_check(node_on)),
            ]
        };

        NodeFragment {
            path: path.clone(),
            entity_name: row.entity_name.clone(),
            joins,
            projection: project(row, path, prefix),
        }
    }
}
