//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions, following the
//! matching rules of the hosted database closely enough for handlers to behave the same
//! against either backend:
//!
//! - conditions on an array field match when any element matches;
//! - field names may be dotted paths into embedded documents;
//! - patterns are case-insensitive and unanchored.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use regex::{Regex, RegexBuilder};

use docrelay_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
    filter::check_field_name,
};


/// Type-erased, comparable representation of BSON values.
///
/// This enum wraps BSON values and provides comparison operations for
/// filtering queries. It normalizes numeric types to f64 for easy comparison.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// DateTime value
    DateTime(DateTime),
    /// Object identity
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compiled patterns, shared across the documents of one query.
#[derive(Debug, Default)]
pub(crate) struct PatternCache {
    patterns: HashMap<String, Regex>,
}

impl PatternCache {
    fn get(&mut self, pattern: &str) -> DocumentStoreResult<&Regex> {
        if !self.patterns.contains_key(pattern) {
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| DocumentStoreError::InvalidQuery(format!("invalid pattern \"{pattern}\": {e}")))?;

            self.patterns.insert(pattern.to_string(), regex);
        }

        Ok(&self.patterns[pattern])
    }
}

/// Resolves a dotted path (`address.city`) inside a document.
pub(crate) fn lookup<'d>(document: &'d Document, path: &str) -> Option<&'d Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
    patterns: &'a mut PatternCache,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document, patterns: &'a mut PatternCache) -> Self {
        Self { document, patterns }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Evaluates `expr` against each document, keeping the indices of the matches.
    pub fn matching_indices<'d>(
        documents: impl IntoIterator<Item = &'d Document>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<usize>> {
        let mut patterns = PatternCache::default();
        let mut matches = Vec::new();

        for (index, document) in documents.into_iter().enumerate() {
            if DocumentEvaluator::new(document, &mut patterns).evaluate(expr)? {
                matches.push(index);
            }
        }

        Ok(matches)
    }

    fn compare(&mut self, field_value: &Bson, op: &FieldOp, value: &Bson) -> DocumentStoreResult<bool> {
        Ok(match op {
            FieldOp::Eq => Comparable::from(field_value) == Comparable::from(value),
            FieldOp::Gte | FieldOp::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match op {
                        FieldOp::Gte => ordering != Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            },
            FieldOp::Matches => match (field_value, value) {
                (Bson::String(text), Bson::String(pattern)) => self.patterns.get(pattern)?.is_match(text),
                (_, Bson::String(pattern)) => {
                    // Still compile so an invalid pattern fails the query regardless of the data.
                    self.patterns.get(pattern)?;
                    false
                },
                _ => return Err(DocumentStoreError::InvalidQuery("pattern must be a string".into())),
            },
            FieldOp::AnyOf => match value {
                Bson::Array(candidates) => candidates
                    .iter()
                    .any(|candidate| Comparable::from(field_value) == Comparable::from(candidate)),
                _ => return Err(DocumentStoreError::InvalidQuery("any-of requires an array of values".into())),
            },
        })
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        check_field_name(field)?;

        let field_value = match lookup(self.document, field) {
            Some(field_value) => field_value,
            None => {
                if let (FieldOp::Matches, Bson::String(pattern)) = (op, value) {
                    self.patterns.get(pattern)?;
                }
                return Ok(false);
            },
        };

        if self.compare(field_value, op, value)? {
            return Ok(true);
        }

        // Conditions on an array field also hold when any single element satisfies them.
        if let Bson::Array(elements) = field_value {
            for element in elements {
                if self.compare(element, op, value)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error> {
        check_field_name(field)?;

        let elements = match lookup(self.document, field) {
            Some(Bson::Array(elements)) => elements,
            _ => return Ok(false),
        };

        for element in elements {
            if let Bson::Document(element) = element {
                if DocumentEvaluator::new(element, self.patterns).evaluate(expr)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}
