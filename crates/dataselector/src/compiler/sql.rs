//! SeaQuery building blocks shared by the projector, the join graph and the
//! assembler: column references, scope comparisons, OR-groups, join clauses
//! and LIMIT validation.
//!
//! Values are never formatted into SQL by hand; they travel as
//! [`sea_query::Value`]s and are escaped by the MySQL backend on render.

use std::fmt;

use sea_query::{
    Alias, Cond, Expr, ExprTrait, Func, JoinType, SelectStatement, SimpleExpr, Value,
};

use crate::selector::{ScopeOperator, ScopeValue};

/// Upper bound on the raw limit string; anything longer is rejected unread.
const MAX_LIMIT_LEN: usize = 64;

/// Upper bound on digits per limit number.
const MAX_LIMIT_DIGITS: usize = 20;

/// `` `table`.`column` ``.
pub fn column(table: &str, column: &str) -> SimpleExpr {
    Expr::col((Alias::new(table), Alias::new(column))).into()
}

/// Value of a detail row: `CONCAT_WS('', a.value, a.long_value)`.
///
/// Short values live in `value`, long ones in `long_value`; the concatenation
/// never yields NULL.
pub fn detail_value(alias: &str) -> SimpleExpr {
    Func::cust(Alias::new("CONCAT_WS"))
        .arg("")
        .arg(column(alias, "value"))
        .arg(column(alias, "long_value"))
        .into()
}

/// Join type for a row: `LEFT JOIN` when optional.
pub fn join_type(optional: bool) -> JoinType {
    if optional {
        JoinType::LeftJoin
    } else {
        JoinType::Join
    }
}

/// Convert a scalar scope value.
///
/// `Null` compares as the empty string: detail values are projected through
/// `CONCAT_WS`, which never yields NULL. Lists are flattened by the caller.
fn scalar(value: &ScopeValue) -> Value {
    match value {
        ScopeValue::Null | ScopeValue::List(_) => String::new().into(),
        ScopeValue::Boolean(b) => (*b).into(),
        ScopeValue::Integer(i) => (*i).into(),
        ScopeValue::Float(f) => (*f).into(),
        ScopeValue::String(s) => s.clone().into(),
    }
}

/// Build `target <op> value`.
///
/// List values become `IN (...)`, or `NOT IN (...)` for negated operators.
/// An empty list restricts (`FALSE`) or, when negated, keeps everything.
pub fn comparison(
    target: SimpleExpr,
    operator: ScopeOperator,
    value: &ScopeValue,
) -> SimpleExpr {
    if let ScopeValue::List(items) = value {
        let mut values = Vec::new();
        flatten_into(items, &mut values);
        return match (values.is_empty(), operator.is_negated()) {
            (true, false) => Expr::cust("FALSE"),
            (true, true) => Expr::cust("TRUE"),
            (false, false) => target.is_in(values),
            (false, true) => target.is_not_in(values),
        };
    }

    let value = scalar(value);
    match operator {
        ScopeOperator::Equal => target.eq(value),
        ScopeOperator::NotEqual => target.ne(value),
        ScopeOperator::LessThan => target.lt(value),
        ScopeOperator::LessOrEqual => target.lte(value),
        ScopeOperator::GreaterThan => target.gt(value),
        ScopeOperator::GreaterOrEqual => target.gte(value),
        ScopeOperator::NotEmpty => target.ne(""),
    }
}

fn flatten_into(items: &[ScopeValue], out: &mut Vec<Value>) {
    for item in items {
        match item {
            ScopeValue::List(nested) => flatten_into(nested, out),
            scalar_value => out.push(scalar(scalar_value)),
        }
    }
}

/// Combine predicates into one OR-group, or `None` when there are none.
pub fn any_of(predicates: Vec<SimpleExpr>) -> Option<SimpleExpr> {
    if predicates.is_empty() {
        return None;
    }
    let cond = predicates
        .into_iter()
        .fold(Cond::any(), |cond, predicate| cond.add(predicate));
    Some(cond.into())
}

/// One `JOIN table AS alias ON ...` of the generated statement.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: String,
    pub on: SimpleExpr,
}

impl JoinClause {
    pub fn new(
        join_type: JoinType,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: SimpleExpr,
    ) -> Self {
        Self {
            join_type,
            table: table.into(),
            alias: alias.into(),
            on,
        }
    }

    /// Add this join to `query`.
    pub fn apply(&self, query: &mut SelectStatement) {
        query.join_as(
            self.join_type,
            Alias::new(&self.table),
            Alias::new(&self.alias),
            self.on.clone(),
        );
    }
}

/// A validated `LIMIT` clause: `LIMIT n` or `LIMIT n,m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub first: u64,
    pub second: Option<u64>,
}

impl Limit {
    /// Parse one or two comma-separated non-negative integers.
    ///
    /// Single pass over a length-capped input; returns `None` for anything
    /// else so the caller can omit the clause.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_LIMIT_LEN {
            return None;
        }

        let mut parts = raw.splitn(3, ',');
        let first = parse_count(parts.next()?)?;
        let second = match parts.next() {
            Some(part) => Some(parse_count(part)?),
            None => None,
        };
        if parts.next().is_some() {
            return None;
        }

        Some(Self { first, second })
    }
}

fn parse_count(part: &str) -> Option<u64> {
    let part = part.trim();
    if part.is_empty()
        || part.len() > MAX_LIMIT_DIGITS
        || !part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.second {
            Some(second) => write!(f, "LIMIT {},{}", self.first, second),
            None => write!(f, "LIMIT {}", self.first),
        }
    }
}

/// Render a lone expression as MySQL.
#[cfg(test)]
pub(crate) fn render(expr: &SimpleExpr) -> String {
    use sea_query::{MysqlQueryBuilder, Query};

    let sql = Query::select().expr(expr.clone()).to_string(MysqlQueryBuilder);
    sql.trim_start_matches("SELECT ").to_string()
}

/// Render a join clause as MySQL.
#[cfg(test)]
pub(crate) fn render_join(join: &JoinClause) -> String {
    use sea_query::{MysqlQueryBuilder, Query};

    let mut query = Query::select();
    query.expr(Expr::cust("1")).from(Alias::new("t"));
    join.apply(&mut query);
    let sql = query.to_string(MysqlQueryBuilder);
    sql.trim_start_matches("SELECT 1 FROM `t` ").to_string()
}
