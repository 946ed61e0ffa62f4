//! Data selector request types.
//!
//! Provides the declarative selector tree:
//! - SelectorRequest: literal SQL passthrough or a selector tree
//! - Selector / ConnectionRow / Connection: entity nodes and their hops
//! - Field: projected field with optional language variants
//! - Scope / ScopeRow / ScopeOperator / ScopeValue: filter predicates

use serde::{Deserialize, Serialize};

use super::modes::LinkModes;
use crate::error::SelectorResult;

/// A compile request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRequest {
    /// Literal SQL. When non-empty it is returned untouched.
    #[serde(default)]
    pub query: Option<String>,

    /// Selector tree to compile.
    #[serde(default)]
    pub selector: Option<Selector>,

    /// Comma-separated entity types the main item must belong to.
    #[serde(default)]
    pub entity_types: Option<String>,

    /// Raw limit string (`"10"` or `"10,20"`).
    #[serde(default)]
    pub limit: Option<String>,
}

impl SelectorRequest {
    /// Parse a request from its JSON wire format.
    pub fn from_json(json: &str) -> SelectorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Request for a selector tree.
    pub fn for_selector(selector: Selector) -> Self {
        Self {
            selector: Some(selector),
            ..Default::default()
        }
    }

    /// Request wrapping literal SQL.
    pub fn literal(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Set the limit string.
    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Set the entity-type filter.
    pub fn with_entity_types(mut self, entity_types: impl Into<String>) -> Self {
        self.entity_types = Some(entity_types.into());
        self
    }

    /// The literal query, if one was supplied and is not blank.
    pub fn literal_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }

    /// Entity types from the filter string, trimmed, blanks dropped.
    pub fn entity_type_filter(&self) -> Vec<&str> {
        self.entity_types
            .as_deref()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Root of a selector tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// The main entity node (`item_main`).
    #[serde(default)]
    pub main: ConnectionRow,

    /// Connections hanging off the main node, in addition to `main.connections`.
    #[serde(default)]
    pub connections: Vec<Connection>,

    /// Filters on output aliases, rendered as a HAVING clause.
    #[serde(default)]
    pub having: Vec<Scope>,
}

impl Selector {
    /// Selector rooted at the given entity.
    pub fn new(main: ConnectionRow) -> Self {
        Self {
            main,
            ..Default::default()
        }
    }

    /// All connection groups whose previous node is `item_main`, in declaration order.
    pub fn root_connections(&self) -> impl Iterator<Item = &Connection> {
        self.main.connections.iter().chain(self.connections.iter())
    }

    /// Whether the selector asks for anything at all.
    pub fn is_empty(&self) -> bool {
        self.main.entity_name.trim().is_empty()
            && self.main.scope.is_empty()
            && self.having.is_empty()
    }
}

/// A named group of sibling connection rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Group name (informational).
    #[serde(default)]
    pub name: String,

    /// Sibling rows at the same depth.
    #[serde(default)]
    pub connection_rows: Vec<ConnectionRow>,
}

impl Connection {
    /// Group holding the given rows.
    pub fn new(name: impl Into<String>, rows: Vec<ConnectionRow>) -> Self {
        Self {
            name: name.into(),
            connection_rows: rows,
        }
    }
}

/// One entity node of the selector tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRow {
    /// Entity type of the items this node selects.
    #[serde(default)]
    pub entity_name: String,

    /// Link type number for the hop from the previous node (0 = any).
    #[serde(default)]
    pub type_number: i32,

    /// Direction and join-kind flags.
    #[serde(default)]
    pub modes: LinkModes,

    /// Fields to project.
    #[serde(default)]
    pub fields: Vec<Field>,

    /// Filters on this node's fields.
    #[serde(default)]
    pub scope: Vec<Scope>,

    /// Nested hops from this node.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl ConnectionRow {
    /// Node for the given entity with no fields.
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            ..Default::default()
        }
    }

    /// Set the link type number.
    pub fn with_type_number(mut self, type_number: i32) -> Self {
        self.type_number = type_number;
        self
    }

    /// Set the modes.
    pub fn with_modes(mut self, modes: LinkModes) -> Self {
        self.modes = modes;
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a scope.
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope.push(scope);
        self
    }

    /// Add a connection group.
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Whether any requested field has the given name (case-insensitive).
    pub fn requests_field(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.field_name.eq_ignore_ascii_case(name))
    }
}

/// A field to project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Storage name (item column or detail key).
    pub field_name: String,

    /// Output column alias. Empty means the field name.
    #[serde(default)]
    pub field_alias: String,

    /// Language variants to project. Empty means the unspecified language.
    #[serde(default)]
    pub language_codes: Vec<String>,
}

impl Field {
    /// Field projected under its own name.
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    /// Set the output alias.
    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.field_alias = alias.into();
        self
    }

    /// Set the language variants.
    pub fn in_languages(mut self, codes: &[&str]) -> Self {
        self.language_codes = codes.iter().map(|c| (*c).to_string()).collect();
        self
    }

    /// Alias used in the SELECT list.
    pub fn output_alias(&self) -> &str {
        if self.field_alias.trim().is_empty() {
            &self.field_name
        } else {
            &self.field_alias
        }
    }
}

/// A group of OR-combined filter rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(default)]
    pub scope_rows: Vec<ScopeRow>,
}

impl Scope {
    /// Scope with the given rows.
    pub fn new(rows: Vec<ScopeRow>) -> Self {
        Self { scope_rows: rows }
    }
}

/// One filter predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRow {
    /// Referenced field name (or output alias, for HAVING).
    pub key: String,

    /// Comparison operator.
    #[serde(default)]
    pub operator: ScopeOperator,

    /// Value to compare against.
    #[serde(default)]
    pub value: ScopeValue,
}

impl ScopeRow {
    /// Predicate `key <operator> value`.
    pub fn new(key: impl Into<String>, operator: ScopeOperator, value: ScopeValue) -> Self {
        Self {
            key: key.into(),
            operator,
            value,
        }
    }
}

/// Comparison operators accepted by scopes.
///
/// Parsed from the human-readable labels used by selector JSON. Any label
/// that is not recognized falls back to [`ScopeOperator::Equal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScopeOperator {
    #[default]
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    /// Value must differ from the empty string.
    NotEmpty,
}

impl ScopeOperator {
    /// Parse an operator label.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        [
            Self::NotEqual,
            Self::LessThan,
            Self::LessOrEqual,
            Self::GreaterThan,
            Self::GreaterOrEqual,
            Self::NotEmpty,
        ]
        .into_iter()
        .find(|op| op.label().eq_ignore_ascii_case(label))
        .unwrap_or(Self::Equal)
    }

    /// Wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Equal => "is equal to",
            Self::NotEqual => "is not equal to",
            Self::LessThan => "is less than",
            Self::LessOrEqual => "is less than or equal to",
            Self::GreaterThan => "is greater than",
            Self::GreaterOrEqual => "is greater than or equal to",
            Self::NotEmpty => "is not empty",
        }
    }

    /// Whether list values are excluded rather than included.
    pub fn is_negated(&self) -> bool {
        matches!(self, Self::NotEqual | Self::NotEmpty)
    }
}

impl From<String> for ScopeOperator {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ScopeOperator> for String {
    fn from(op: ScopeOperator) -> Self {
        op.label().to_string()
    }
}

/// Scope values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeValue {
    /// No value; compares as the empty string.
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// List of values (rendered as `IN (...)` / `NOT IN (...)`).
    List(Vec<ScopeValue>),
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ScopeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn operator_labels_map_to_variants() {
        let cases = [
            ("is not equal to", ScopeOperator::NotEqual),
            ("is less than", ScopeOperator::LessThan),
            ("is less than or equal to", ScopeOperator::LessOrEqual),
            ("is greater than", ScopeOperator::GreaterThan),
            ("is greater than or equal to", ScopeOperator::GreaterOrEqual),
            ("is not empty", ScopeOperator::NotEmpty),
            ("is equal to", ScopeOperator::Equal),
            ("resembles", ScopeOperator::Equal),
            ("", ScopeOperator::Equal),
        ];
        for (label, operator) in cases {
            assert_eq!(ScopeOperator::from_label(label), operator, "label {label:?}");
        }
    }

    #[test]
    fn operator_deserializes_from_label() {
        let row: ScopeRow =
            serde_json::from_str(r#"{"key": "price", "operator": "Is Greater Than", "value": 5}"#)
                .unwrap();
        assert_eq!(row.operator, ScopeOperator::GreaterThan);
        assert_eq!(row.value, ScopeValue::Integer(5));
    }

    #[test]
    fn scope_value_shapes() {
        let list: ScopeValue = serde_json::from_str(r#"["a", 2, null]"#).unwrap();
        assert_eq!(
            list,
            ScopeValue::List(vec![
                ScopeValue::String("a".to_string()),
                ScopeValue::Integer(2),
                ScopeValue::Null,
            ])
        );
        let float: ScopeValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(float, ScopeValue::Float(2.5));
    }

    #[test]
    fn request_parses_camel_case_tree() {
        let json = r#"{
            "limit": "10",
            "selector": {
                "main": {
                    "entityName": "product",
                    "fields": [{"fieldName": "title", "languageCodes": ["nl", "en"]}],
                    "connections": [{
                        "name": "variants",
                        "connectionRows": [{"entityName": "variant", "modes": ["optional"]}]
                    }]
                }
            }
        }"#;
        let request = SelectorRequest::from_json(json).unwrap();
        let selector = request.selector.unwrap();
        assert_eq!(selector.main.entity_name, "product");
        assert_eq!(selector.main.fields[0].output_alias(), "title");
        assert_eq!(selector.main.fields[0].language_codes, vec!["nl", "en"]);
        let child = &selector.main.connections[0].connection_rows[0];
        assert!(child.modes.optional);
        assert_eq!(request.limit.as_deref(), Some("10"));
    }

    #[test]
    fn blank_literal_query_is_ignored() {
        assert_eq!(SelectorRequest::literal("  ").literal_query(), None);
        assert_eq!(
            SelectorRequest::literal(" SELECT 1 ").literal_query(),
            Some(" SELECT 1 ")
        );
    }

    #[test]
    fn entity_type_filter_splits_and_trims() {
        let request = SelectorRequest::default().with_entity_types("product, ,variant ");
        assert_eq!(request.entity_type_filter(), vec!["product", "variant"]);
    }

    #[test]
    fn selector_emptiness() {
        assert!(Selector::default().is_empty());
        assert!(!Selector::new(ConnectionRow::new("product")).is_empty());
        let scoped = Selector::new(ConnectionRow::default().with_scope(Scope::new(vec![
            ScopeRow::new("title", ScopeOperator::Equal, "x".into()),
        ])));
        assert!(!scoped.is_empty());
    }
}
