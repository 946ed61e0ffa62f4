//! Data selector compiler library.
//!
//! Compiles declarative selector trees into a single MySQL SELECT over the
//! item / item-detail / item-link model. The `dataselector` binary wraps
//! this library for command-line use.

pub mod compiler;
pub mod config;
pub mod db;
pub mod error;
pub mod metadata;
pub mod selector;

pub use compiler::SelectorCompiler;
pub use config::Config;
pub use error::{SelectorError, SelectorResult};
pub use metadata::{MetadataStore, MySqlMetadataStore, StaticMetadataStore};
pub use selector::SelectorRequest;
