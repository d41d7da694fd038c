//! Document filters, sort orders and pages
//!
//! Filters are compiled into `WHERE` clauses over the JSON documents
//! (`doc ->> '$.field'`). Field names are always `&'static str` supplied by
//! repository code, values are always bound parameters.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};

/// Scalar value a document field is compared against
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Integer field
    Int(i64),
    /// Floating point field
    Float(f64),
    /// Text field
    Text(String),
    /// Boolean field (JSON `true`/`false` read back as 1/0)
    Bool(bool),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Gt,
    Gte,
    Lte,
}

impl CmpOp {
    fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Gt => " > ",
            CmpOp::Gte => " >= ",
            CmpOp::Lte => " <= ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(&'static str, FieldValue),
    Cmp(&'static str, CmpOp, FieldValue),
    Contains(&'static str, String),
    NotNull(&'static str),
    AnyGte(&'static [&'static str], FieldValue),
    CreatedBetween(DateTime<Utc>, DateTime<Utc>),
}

/// SQL expression reading `field` out of the document column
pub(crate) fn field_expr(field: &str) -> String {
    format!("doc ->> '$.{}'", field)
}

fn push_value(qb: &mut QueryBuilder<'_, Sqlite>, value: &FieldValue) {
    match value {
        FieldValue::Int(v) => qb.push_bind(*v),
        FieldValue::Float(v) => qb.push_bind(*v),
        FieldValue::Text(v) => qb.push_bind(v.clone()),
        FieldValue::Bool(v) => qb.push_bind(*v),
    };
}

impl Condition {
    fn push(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Condition::Eq(field, value) => {
                qb.push(field_expr(field)).push(" = ");
                push_value(qb, value);
            }
            Condition::Cmp(field, op, value) => {
                qb.push(field_expr(field)).push(op.as_sql());
                push_value(qb, value);
            }
            Condition::Contains(field, needle) => {
                qb.push("instr(lower(")
                    .push(field_expr(field))
                    .push("), lower(")
                    .push_bind(needle.clone())
                    .push(")) > 0");
            }
            Condition::NotNull(field) => {
                qb.push(field_expr(field)).push(" IS NOT NULL");
            }
            Condition::AnyGte(fields, value) => {
                qb.push("(");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push(field_expr(field)).push(" >= ");
                    push_value(qb, value);
                }
                qb.push(")");
            }
            Condition::CreatedBetween(start, end) => {
                qb.push("created_at >= ")
                    .push_bind(*start)
                    .push(" AND created_at <= ")
                    .push_bind(*end);
            }
        }
    }
}

/// Conjunction of conditions over a collection's documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Empty filter (matches every document)
    pub fn new() -> Self {
        Self::default()
    }

    /// `field == value`
    pub fn eq(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::Eq(field, value.into()));
        self
    }

    /// `field == value` when a value is given
    pub fn eq_opt<V: Into<FieldValue>>(self, field: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    /// `field > value`
    pub fn gt(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.conditions
            .push(Condition::Cmp(field, CmpOp::Gt, value.into()));
        self
    }

    /// `field >= value`
    pub fn gte(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.conditions
            .push(Condition::Cmp(field, CmpOp::Gte, value.into()));
        self
    }

    /// `field >= value` when a value is given
    pub fn gte_opt<V: Into<FieldValue>>(self, field: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.gte(field, v),
            None => self,
        }
    }

    /// `field <= value` when a value is given
    pub fn lte_opt<V: Into<FieldValue>>(mut self, field: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.conditions
                .push(Condition::Cmp(field, CmpOp::Lte, v.into()));
        }
        self
    }

    /// Case-insensitive substring match
    pub fn contains(mut self, field: &'static str, needle: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Contains(field, needle.into()));
        self
    }

    /// Field is present and not null
    pub fn not_null(mut self, field: &'static str) -> Self {
        self.conditions.push(Condition::NotNull(field));
        self
    }

    /// At least one of `fields` is `>= value`
    pub fn any_gte(mut self, fields: &'static [&'static str], value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::AnyGte(fields, value.into()));
        self
    }

    /// Record creation time within `[start, end]`
    pub fn created_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.conditions.push(Condition::CreatedBetween(start, end));
        self
    }

    /// No conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE ...` (nothing when the filter is empty)
    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            condition.push(qb);
        }
    }
}

/// Sort order for `find`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    /// Document field to order by
    pub field: &'static str,
    /// Descending when true
    pub descending: bool,
}

impl Sort {
    /// Ascending order on `field`
    pub fn asc(field: &'static str) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    /// Descending order on `field`
    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    pub(crate) fn push_order_by(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" ORDER BY ")
            .push(field_expr(self.field))
            .push(if self.descending { " DESC" } else { " ASC" })
            // id breaks ties so pages never overlap
            .push(", id ASC");
    }
}

/// Offset window over a sorted result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Documents to skip
    pub skip: u64,
    /// Maximum documents to return
    pub limit: u64,
}

impl Page {
    /// Window of `limit` documents starting at `skip`
    pub fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    pub(crate) fn push_limit(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" LIMIT ")
            .push_bind(self.limit as i64)
            .push(" OFFSET ")
            .push_bind(self.skip as i64);
    }
}
