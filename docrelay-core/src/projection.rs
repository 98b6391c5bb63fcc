//! Field projections for find queries.
//!
//! A [`Projection`] lists the fields a read should return. It is parsed from the
//! comma-separated `fields` request parameter and rendered as an inclusion document.
//! The identity field is never mentioned, so backends return it alongside the listed
//! fields.

use bson::{Bson, Document};

/// An ordered set of fields to include in query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Parses a comma-separated field list such as `"name, email"`.
    ///
    /// Entries are trimmed; empty entries and repeats are dropped. `None` or a blank
    /// string yields an empty projection (all fields).
    pub fn parse(fields: Option<&str>) -> Self {
        let mut projection = Projection::default();

        for field in fields.unwrap_or_default().split(',').map(str::trim) {
            if !field.is_empty() && !projection.fields.iter().any(|f| f == field) {
                projection.fields.push(field.to_string());
            }
        }

        projection
    }

    /// Returns `true` if every field should be returned.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The included field names, in request order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Renders the projection as `{ field: 1, ... }`.
    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|field| (field.clone(), Bson::Int32(1)))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut projection = Projection::default();

        for field in iter.into_iter().map(Into::into) {
            if !projection.fields.contains(&field) {
                projection.fields.push(field);
            }
        }

        projection
    }
}
