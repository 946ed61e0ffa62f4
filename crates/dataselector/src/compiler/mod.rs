//! Selector compiler module.
//!
//! This module provides:
//! - SelectorCompiler: request → SQL entry point (assembler)
//! - JoinGraphBuilder: recursive connection walk producing join fragments
//! - project: per-node field projection and scope translation
//! - IterationPath: deterministic alias derivation
//! - sql: SeaQuery column, comparison and join helpers, bounded LIMIT validation

mod assembler;
mod joins;
mod path;
mod projector;
mod sql;

pub use assembler::{DEFAULT_METADATA_TIMEOUT, SelectorCompiler, assemble};
pub use joins::{
    Direction, JoinGraphBuilder, Lookup, MAX_CONNECTION_DEPTH, NodeFragment, hop_key,
    plan_lookups,
};
pub use path::IterationPath;
pub use projector::{Projection, SelectItem, item_column, project};
pub use sql::{JoinClause, Limit, any_of, column, comparison, detail_value};
