//! Field projection for one entity node.
//!
//! Turns a connection row's requested fields and scopes into SELECT
//! expressions, detail-table joins and WHERE predicates. Fields either live on
//! the item table itself or as key/value rows in the item-detail table, one
//! join per requested language.

use sea_query::{Alias, Expr, ExprTrait, Query, SimpleExpr};

use super::path::IterationPath;
use super::sql::{JoinClause, any_of, column, comparison, detail_value, join_type};
use crate::selector::{ConnectionRow, Field, ScopeRow};

/// Fields stored as item-table columns: (field name, column).
const ITEM_COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("idencrypted", "id"),
    ("unique_uuid", "unique_uuid"),
    ("itemtitle", "title"),
    ("changed_on", "changed_on"),
    ("changed_by", "changed_by"),
];

/// Output alias suffix telling downstream consumers to encrypt the id.
const ENCRYPT_SUFFIX: &str = "_encrypt_withdate";

/// Item-table column backing a field name, if any.
pub fn item_column(field_name: &str) -> Option<&'static str> {
    ITEM_COLUMNS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(field_name))
        .map(|(_, column)| *column)
}

/// One `expr AS alias` entry of the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SimpleExpr,
    pub alias: String,
}

/// Fragments contributed by one node's fields and scopes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Output columns, in field order.
    pub select: Vec<SelectItem>,
    /// Detail-table joins, in field and language order.
    pub joins: Vec<JoinClause>,
    /// Predicate groups to AND into the WHERE clause.
    pub predicates: Vec<SimpleExpr>,
}

impl Projection {
    fn push_select(&mut self, expr: SimpleExpr, alias: String) {
        self.select.push(SelectItem { expr, alias });
    }
}

/// Project `row` at `path`; `table_prefix` is the row entity's normalized prefix.
pub fn project(row: &ConnectionRow, path: &IterationPath, table_prefix: &str) -> Projection {
    let node = path.item_alias();
    let detail_table = format!("{table_prefix}wiser_itemdetail");

    let fields = effective_fields(row, path);
    let mut projection = Projection::default();

    for (index, field) in fields.iter().enumerate() {
        let targets = match item_column(&field.field_name) {
            Some(item_col) => {
                let expr = column(&node, item_col);
                let alias = if field.field_name.eq_ignore_ascii_case("idencrypted") {
                    format!("{}{ENCRYPT_SUFFIX}", field.output_alias())
                } else {
                    field.output_alias().to_string()
                };
                projection.push_select(expr.clone(), alias);
                vec![expr]
            }
            None => {
                let languages = languages(field);
                let mut targets = Vec::with_capacity(languages.len().max(1));

                if languages.is_empty() {
                    let join_alias = detail_alias(path, index, None);
                    projection
                        .joins
                        .push(detail_join(row, &detail_table, &join_alias, &node, field, ""));
                    let expr = detail_value(&join_alias);
                    projection.push_select(expr.clone(), field.output_alias().to_string());
                    targets.push(expr);
                }

                // Each language gets its own join; the output alias carries the
                // code itself once there is more than one.
                let suffix_alias = languages.len() > 1;
                for (position, language) in languages.iter().enumerate() {
                    let join_alias = detail_alias(path, index, Some(position));
                    projection
                        .joins
                        .push(detail_join(row, &detail_table, &join_alias, &node, field, language));
                    let expr = detail_value(&join_alias);
                    let alias = if suffix_alias {
                        format!("{}_{language}", field.output_alias())
                    } else {
                        field.output_alias().to_string()
                    };
                    projection.push_select(expr.clone(), alias);
                    targets.push(expr);
                }
                targets
            }
        };

        for scope in &row.scope {
            let mut predicates = Vec::new();
            for scope_row in scope
                .scope_rows
                .iter()
                .filter(|r| r.key.eq_ignore_ascii_case(&field.field_name))
            {
                for target in &targets {
                    predicates.push(comparison(
                        target.clone(),
                        scope_row.operator,
                        &scope_row.value,
                    ));
                }
            }
            projection.predicates.extend(any_of(predicates));
        }
    }

    project_unselected_scopes(row, &fields, &node, &detail_table, &mut projection);
    projection
}

/// Requested fields with the implicit `id` prepended when missing.
///
/// The implicit id is aliased `id` on the main node and `{itemAlias}_id` on
/// connection nodes so result columns stay distinct.
fn effective_fields(row: &ConnectionRow, path: &IterationPath) -> Vec<Field> {
    let mut fields = Vec::with_capacity(row.fields.len() + 1);
    if !row.requests_field("id") {
        let alias = if path.is_root() {
            "id".to_string()
        } else {
            format!("{}_id", path.item_alias())
        };
        fields.push(Field::new("id").aliased(alias));
    }
    fields.extend(row.fields.iter().cloned());
    fields
}

/// Requested languages, trimmed and deduplicated case-insensitively (MySQL
/// aliases are case-insensitive). Empty when none were requested.
fn languages(field: &Field) -> Vec<&str> {
    let mut languages: Vec<&str> = Vec::new();
    for code in &field.language_codes {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        if !languages.iter().any(|seen| seen.eq_ignore_ascii_case(code)) {
            languages.push(code);
        }
    }
    languages
}

/// Join alias of a detail field.
///
/// Languages are identified by position (`_l0`, `_l1`, ...). Path keys are
/// digits and underscores only, so the `l` marker keeps aliases of different
/// nodes, fields and languages apart.
fn detail_alias(path: &IterationPath, index: usize, language: Option<usize>) -> String {
    match language {
        None => format!("idv_{}_{index}", path.key()),
        Some(position) => format!("idv_{}_{index}_l{position}", path.key()),
    }
}

fn detail_join(
    row: &ConnectionRow,
    detail_table: &str,
    join_alias: &str,
    node: &str,
    field: &Field,
    language: &str,
) -> JoinClause {
    let on = column(join_alias, "item_id")
        .eq(column(node, "id"))
        .and(column(join_alias, "key").eq(field.field_name.as_str()))
        .and(column(join_alias, "language_code").eq(language));
    JoinClause::new(join_type(row.modes.optional), detail_table, join_alias, on)
}

/// Scopes on fields that are not projected.
///
/// Item-table fields are compared on the node's column directly; detail fields
/// are checked with an `EXISTS` subquery against the detail table, since
/// there is no projected join to reference.
fn project_unselected_scopes(
    row: &ConnectionRow,
    fields: &[Field],
    node: &str,
    detail_table: &str,
    projection: &mut Projection,
) {
    let is_projected = |key: &str| fields.iter().any(|f| f.field_name.eq_ignore_ascii_case(key));

    for scope in &row.scope {
        let mut keys: Vec<&str> = Vec::new();
        for scope_row in &scope.scope_rows {
            if !is_projected(&scope_row.key)
                && !keys.iter().any(|k| k.eq_ignore_ascii_case(&scope_row.key))
            {
                keys.push(&scope_row.key);
            }
        }

        for key in keys {
            let predicates: Vec<SimpleExpr> = scope
                .scope_rows
                .iter()
                .filter(|r| r.key.eq_ignore_ascii_case(key))
                .map(|r| unselected_predicate(r, node, detail_table))
                .collect();
            projection.predicates.extend(any_of(predicates));
        }
    }
}

fn unselected_predicate(row: &ScopeRow, node: &str, detail_table: &str) -> SimpleExpr {
    if let Some(item_col) = item_column(&row.key) {
        return comparison(column(node, item_col), row.operator, &row.value);
    }

    let alias = format!("isv_{node}");
    let mut exists = Query::select();
    exists
        .expr(Expr::cust("1"))
        .from_as(Alias::new(detail_table), Alias::new(&alias))
        .and_where(column(&alias, "item_id").eq(column(node, "id")))
        .and_where(column(&alias, "key").eq(row.key.as_str()))
        .and_where(comparison(detail_value(&alias), row.operator, &row.value));
    Expr::exists(exists)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::compiler::sql::{render, render_join};
    use crate::selector::{LinkModes, Scope, ScopeOperator, ScopeValue};

    fn root() -> IterationPath {
        IterationPath::root()
    }

    fn aliases(projection: &Projection) -> Vec<&str> {
        projection.select.iter().map(|s| s.alias.as_str()).collect()
    }

    #[test]
    fn implicit_id_is_prepended() {
        let row = ConnectionRow::new("product");
        let projection = project(&row, &root(), "");
        assert_eq!(aliases(&projection), vec!["id"]);
        assert_eq!(render(&projection.select[0].expr), "`item_main`.`id`");
        assert!(projection.joins.is_empty());
    }

    #[test]
    fn explicit_id_is_not_duplicated() {
        let row = ConnectionRow::new("product").with_field(Field::new("id").aliased("productId"));
        let projection = project(&row, &root(), "");
        assert_eq!(aliases(&projection), vec!["productId"]);
    }

    #[test]
    fn connection_node_id_alias_uses_item_alias() {
        let row = ConnectionRow::new("variant");
        let projection = project(&row, &root().child(2), "");
        assert_eq!(aliases(&projection), vec!["item_2_id"]);
        assert_eq!(render(&projection.select[0].expr), "`item_2`.`id`");
    }

    #[test]
    fn item_table_special_cases() {
        let row = ConnectionRow::new("product")
            .with_field(Field::new("itemtitle").aliased("name"))
            .with_field(Field::new("idencrypted").aliased("encryptedId"));
        let projection = project(&row, &root(), "");
        assert_eq!(
            aliases(&projection),
            vec!["id", "name", "encryptedId_encrypt_withdate"]
        );
        assert_eq!(render(&projection.select[1].expr), "`item_main`.`title`");
        assert_eq!(render(&projection.select[2].expr), "`item_main`.`id`");
    }

    #[test]
    fn detail_field_joins_detail_table() {
        let row = ConnectionRow::new("product").with_field(Field::new("title"));
        let projection = project(&row, &root(), "shop_");

        assert_eq!(projection.joins.len(), 1);
        assert_eq!(
            render_join(&projection.joins[0]),
            "JOIN `shop_wiser_itemdetail` AS `idv_main_1` ON `idv_main_1`.`item_id` = `item_main`.`id` \
             AND `idv_main_1`.`key` = 'title' AND `idv_main_1`.`language_code` = ''"
        );
        assert_eq!(projection.select[1].alias, "title");
        assert_eq!(
            render(&projection.select[1].expr),
            "CONCAT_WS('', `idv_main_1`.`value`, `idv_main_1`.`long_value`)"
        );
    }

    #[test]
    fn optional_row_uses_left_joins() {
        let row = ConnectionRow::new("product")
            .with_modes(LinkModes::NONE.with_optional())
            .with_field(Field::new("title"));
        let projection = project(&row, &root(), "");
        assert_eq!(projection.joins[0].join_type, sea_query::JoinType::LeftJoin);
    }

    #[test]
    fn languages_produce_distinct_joins_and_aliases() {
        let row = ConnectionRow::new("product")
            .with_field(Field::new("title").in_languages(&["nl", "en", "NL", " "]));
        let projection = project(&row, &root(), "");

        assert_eq!(projection.joins.len(), 2);
        assert_eq!(projection.joins[0].alias, "idv_main_1_l0");
        assert!(
            render_join(&projection.joins[0]).ends_with("`idv_main_1_l0`.`language_code` = 'nl'")
        );
        assert_eq!(projection.joins[1].alias, "idv_main_1_l1");
        assert!(
            render_join(&projection.joins[1]).ends_with("`idv_main_1_l1`.`language_code` = 'en'")
        );
        assert_eq!(aliases(&projection), vec!["id", "title_nl", "title_en"]);
    }

    #[test]
    fn single_language_keeps_plain_alias() {
        let row =
            ConnectionRow::new("product").with_field(Field::new("title").in_languages(&["nl"]));
        let projection = project(&row, &root(), "");
        assert_eq!(projection.joins[0].alias, "idv_main_1_l0");
        assert_eq!(aliases(&projection), vec!["id", "title"]);
    }

    #[test]
    fn codes_that_sanitize_alike_stay_distinct() {
        let row = ConnectionRow::new("product")
            .with_field(Field::new("title").in_languages(&["nl-NL", "nl_NL"]));
        let projection = project(&row, &root(), "");

        let join_aliases: HashSet<&str> =
            projection.joins.iter().map(|j| j.alias.as_str()).collect();
        assert_eq!(join_aliases.len(), 2);
        assert_eq!(aliases(&projection), vec!["id", "title_nl-NL", "title_nl_NL"]);
    }

    #[test]
    fn numeric_codes_do_not_collide_with_deeper_paths() {
        // Path [1], third field, language "3" against path [1, 2], fourth field.
        let shallow = ConnectionRow::new("a")
            .with_field(Field::new("f1"))
            .with_field(Field::new("f2").in_languages(&["3"]));
        let deep = ConnectionRow::new("b")
            .with_field(Field::new("f1"))
            .with_field(Field::new("f2"))
            .with_field(Field::new("f3"));

        let shallow = project(&shallow, &root().child(1), "");
        let deep = project(&deep, &root().child(1).child(2), "");

        let shallow: HashSet<&str> = shallow.joins.iter().map(|j| j.alias.as_str()).collect();
        for join in &deep.joins {
            assert!(!shallow.contains(join.alias.as_str()), "{} reused", join.alias);
        }
    }

    #[test]
    fn field_scopes_or_within_scope_and_across_scopes() {
        let row = ConnectionRow::new("product")
            .with_field(Field::new("color"))
            .with_scope(Scope::new(vec![
                ScopeRow::new("color", ScopeOperator::Equal, "red".into()),
                ScopeRow::new("color", ScopeOperator::Equal, "blue".into()),
            ]))
            .with_scope(Scope::new(vec![ScopeRow::new(
                "color",
                ScopeOperator::NotEmpty,
                ScopeValue::Null,
            )]));
        let projection = project(&row, &root(), "");

        let target = "CONCAT_WS('', `idv_main_1`.`value`, `idv_main_1`.`long_value`)";
        let rendered: Vec<String> = projection.predicates.iter().map(render).collect();
        assert_eq!(
            rendered,
            vec![
                format!("{target} = 'red' OR {target} = 'blue'"),
                format!("{target} <> ''"),
            ]
        );
    }

    #[test]
    fn unselected_item_column_scope_uses_column() {
        let row = ConnectionRow::new("product").with_scope(Scope::new(vec![ScopeRow::new(
            "changed_by",
            ScopeOperator::Equal,
            "admin".into(),
        )]));
        let projection = project(&row, &root(), "");
        assert_eq!(projection.predicates.len(), 1);
        assert_eq!(render(&projection.predicates[0]), "`item_main`.`changed_by` = 'admin'");
    }

    #[test]
    fn unselected_detail_scope_uses_exists() {
        let row = ConnectionRow::new("product").with_scope(Scope::new(vec![ScopeRow::new(
            "price",
            ScopeOperator::GreaterThan,
            ScopeValue::Integer(10),
        )]));
        let projection = project(&row, &root(), "");

        assert_eq!(projection.predicates.len(), 1);
        assert_eq!(
            render(&projection.predicates[0]),
            "EXISTS (SELECT 1 FROM `wiser_itemdetail` AS `isv_item_main` \
             WHERE `isv_item_main`.`item_id` = `item_main`.`id` \
             AND `isv_item_main`.`key` = 'price' \
             AND CONCAT_WS('', `isv_item_main`.`value`, `isv_item_main`.`long_value`) > 10)"
        );
        assert!(projection.joins.is_empty(), "no projected join for unselected field");
    }
}
