//! Query translation from the docrelay filter AST to MongoDB query syntax.
//!
//! This module translates abstract filter expressions into MongoDB BSON filter
//! documents for execution by the MongoDB query engine.

use bson::{Document, Bson, doc};

use docrelay_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::DocumentStoreError,
    filter::check_field_name,
};


/// Translates docrelay filter expressions into MongoDB filter documents.
///
/// Conjunctions over distinct fields are flattened into a single document
/// (`{ title: {...}, year: {...} }`); `$and` is only emitted when two conditions
/// constrain the same key.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        let clauses = exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect::<Result<Vec<_>, _>>()?;

        let mut merged = Document::new();
        let mut collides = false;

        for (key, value) in clauses.iter().flatten() {
            collides |= merged.insert(key.clone(), value.clone()).is_some();
        }

        if collides {
            return Ok(doc! { "$and": clauses });
        }

        Ok(merged)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        check_field_name(field)?;

        Ok(doc! {
            field: match op {
                FieldOp::Eq => Bson::Document(doc! { "$eq": value.clone() }),
                FieldOp::Gte => doc! { "$gte": value.clone() }.into(),
                FieldOp::Lte => doc! { "$lte": value.clone() }.into(),
                FieldOp::Matches => match value {
                    Bson::String(pattern) => doc! { "$regex": pattern.as_str(), "$options": "i" }.into(),
                    _ => return Err(DocumentStoreError::InvalidQuery("Pattern match requires a string value".to_string())),
                },
                FieldOp::AnyOf => match value {
                    Bson::Array(values) => doc! { "$in": values.clone() }.into(),
                    _ => return Err(DocumentStoreError::InvalidQuery("AnyOf operator requires an array value".to_string())),
                },
            }
        })
    }

    fn visit_elem_match(&mut self, field: &str, expr: &Expr) -> Result<Self::Output, Self::Error> {
        check_field_name(field)?;

        Ok(doc! {
            field: { "$elemMatch": self.visit_expr(expr)? },
        })
    }
}
