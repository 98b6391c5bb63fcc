//! Query construction and filtering API for document stores.
//!
//! This module provides the backend-neutral filter AST, a find query that pairs a
//! filter with a projection, and a visitor trait that backends implement to execute
//! or translate filters.
//!
//! # Query Building
//!
//! ```ignore
//! use docrelay_core::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::matches("name", "john").and(Filter::gte("age", 21)))
//!     .projection(Projection::parse(Some("name,email")))
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static constructors for the conditions a request
//! can express:
//!
//! - Comparison: `eq`, `gte`, `lte`
//! - Pattern: `matches` (case-insensitive, unanchored regular expression)
//! - Membership: `any_of`
//! - Arrays: `elem_match`
//! - Logical: `and`

use bson::Bson;

use crate::{error::DocumentStoreError, projection::Projection};

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Greater than or equal to.
    Gte,
    /// Less than or equal to.
    Lte,
    /// String matches a case-insensitive regular expression anywhere in the value.
    Matches,
    /// Field equals any of the values in an array.
    AnyOf,
}

/// A filter expression for querying documents.
///
/// # Example
///
/// ```ignore
/// use docrelay_core::query::Filter;
///
/// // Documents whose `benefits` array holds an element with a matching `feature`
/// let expr = Filter::elem_match("benefits", Filter::matches("feature", "cooling"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Field comparison expression.
    Field {
        /// The field name (or dotted path) to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
    /// At least one element of the array field satisfies the inner expression.
    ///
    /// Field names inside the inner expression are relative to the array element.
    ElemMatch {
        /// The array field name.
        field: String,
        /// The condition evaluated against each element.
        expr: Box<Expr>,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }
}

/// A find query: an optional filter plus the fields to return.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents. `None` matches everything.
    pub filter: Option<Expr>,
    /// Fields to include in each returned document. Empty means all fields.
    pub projection: Projection,
}

impl Query {
    /// Creates a new query matching every document and returning all fields.
    pub fn new() -> Self {
        Query {
            filter: None,
            projection: Projection::default(),
        }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field is greater than or equal to the specified value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Matches documents where the field is less than or equal to the specified value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches documents where the string field matches `pattern` case-insensitively.
    ///
    /// The pattern is a regular expression and is not escaped.
    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Matches, Bson::String(pattern.into()))
    }

    /// Matches documents where the field equals any of the given values.
    pub fn any_of(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Bson>>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::AnyOf,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where some element of the array field satisfies `expr`.
    pub fn elem_match(field: impl Into<String>, expr: Expr) -> Expr {
        Expr::ElemMatch {
            field: field.into(),
            expr: Box::new(expr),
        }
    }

    /// Combines multiple expressions such that all must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the filter expression, clearing it when `None`.
    pub fn maybe_filter(mut self, filter: Option<Expr>) -> Self {
        self.query.filter = filter;
        self
    }

    /// Sets the fields to return.
    pub fn projection(mut self, projection: Projection) -> Self {
        self.query.projection = projection;
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
            Expr::ElemMatch { field, expr } => self.visit_elem_match(field, expr),
        }
    }
}
