//! Selector request model.
//!
//! Deserializable description of what to query: a main entity, the fields
//! and scopes on it, and nested connections to related entities.

mod modes;
pub mod types;

pub use modes::LinkModes;
pub use types::{
    Connection, ConnectionRow, Field, Scope, ScopeOperator, ScopeRow, ScopeValue, Selector,
    SelectorRequest,
};
