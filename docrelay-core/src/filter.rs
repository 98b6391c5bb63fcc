//! Translation of query-string parameters into filter expressions.
//!
//! Read requests describe their filter as plain `key=value` pairs. Each pair becomes one
//! condition, chosen by the first rule that applies:
//!
//! 1. keys containing `[].` (`benefits[].feature=cooling`) match array elements whose
//!    nested field matches the value as a case-insensitive pattern;
//! 2. values containing `%3E`, `>` or `gte` become a `>=` numeric bound on whatever
//!    follows the token (`year=gte2000`, `year=>=2000`);
//! 3. values containing `%3C`, `<` or `lte` become a `<=` numeric bound;
//! 4. `true` / `false` become booleans;
//! 5. all-digit values become integers;
//! 6. anything else is a case-insensitive, unanchored pattern match.
//!
//! Values used as patterns are not escaped. The parameters `db`, `collection` and
//! `fields` address the request itself and are never translated.

use bson::Bson;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Filter},
};

/// Request parameters that select the target and shape the response instead of filtering.
pub const RESERVED_PARAMS: [&str; 3] = ["db", "collection", "fields"];

const ELEMENT_TOKEN: &str = "[].";
const GTE_TOKENS: [&str; 4] = ["%3E", "%3e", ">", "gte"];
const LTE_TOKENS: [&str; 4] = ["%3C", "%3c", "<", "lte"];

/// Translates request parameters into a filter expression.
///
/// Reserved parameters are skipped. When a key repeats, the last value wins and keeps the
/// position of the first occurrence. Returns `None` when no filter parameters remain.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidQuery`] when a key is empty or a range bound is
/// not numeric.
pub fn translate<K, V>(params: impl IntoIterator<Item = (K, V)>) -> DocumentStoreResult<Option<Expr>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut conditions: Vec<(String, Expr)> = Vec::new();

    for (key, value) in params {
        let key = key.as_ref();

        if RESERVED_PARAMS.contains(&key) {
            continue;
        }

        let condition = translate_param(key, value.as_ref())?;

        match conditions.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, slot)) => *slot = condition,
            None => conditions.push((key.to_string(), condition)),
        }
    }

    if conditions.is_empty() {
        return Ok(None);
    }

    Ok(Some(Filter::and(conditions.into_iter().map(|(_, expr)| expr))))
}

/// Checks that `field` names a document path rather than a query operator.
///
/// Every dotted segment must be non-empty and must not start with `$`.
pub fn check_field_name(field: &str) -> DocumentStoreResult<()> {
    if field.is_empty() {
        return Err(DocumentStoreError::InvalidQuery("filter key must not be empty".into()));
    }

    if field.split('.').any(|segment| segment.is_empty() || segment.starts_with('$')) {
        return Err(DocumentStoreError::InvalidQuery(format!("\"{field}\" is not a valid field name")));
    }

    Ok(())
}

/// Translates a single `key=value` pair.
pub fn translate_param(key: &str, value: &str) -> DocumentStoreResult<Expr> {
    if key.is_empty() {
        return Err(DocumentStoreError::InvalidQuery("filter key must not be empty".into()));
    }

    if let Some((array_field, nested_field)) = key.split_once(ELEMENT_TOKEN) {
        if array_field.is_empty() || nested_field.is_empty() {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "\"{key}\" must name both the array field and the element field"
            )));
        }

        check_field_name(array_field)?;
        check_field_name(nested_field)?;

        return Ok(Filter::elem_match(array_field, Filter::matches(nested_field, value)));
    }

    check_field_name(key)?;

    if let Some(bound) = bound_after_token(value, &GTE_TOKENS) {
        return Ok(Filter::gte(key, parse_bound(key, value, bound)?));
    }

    if let Some(bound) = bound_after_token(value, &LTE_TOKENS) {
        return Ok(Filter::lte(key, parse_bound(key, value, bound)?));
    }

    Ok(match value {
        "true" => Filter::eq(key, true),
        "false" => Filter::eq(key, false),
        _ if is_integer(value) => Filter::eq(key, parse_integer(value)),
        _ => Filter::matches(key, value),
    })
}

/// Returns the text after the leftmost token present in `value`.
fn bound_after_token<'a>(value: &'a str, tokens: &[&str]) -> Option<&'a str> {
    tokens
        .iter()
        .filter_map(|token| value.find(token).map(|pos| pos + token.len()))
        .min()
        .map(|end| &value[end..])
}

fn parse_bound(key: &str, value: &str, bound: &str) -> DocumentStoreResult<Bson> {
    let bound = bound.trim();
    let bound = bound.strip_prefix('=').unwrap_or(bound).trim();

    if let Ok(int) = bound.parse::<i64>() {
        return Ok(Bson::Int64(int));
    }

    match bound.parse::<f64>() {
        Ok(float) if float.is_finite() => Ok(Bson::Double(float)),
        _ => Err(DocumentStoreError::InvalidQuery(format!(
            "\"{key}\" expects a numeric bound, got \"{value}\""
        ))),
    }
}

fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn parse_integer(value: &str) -> Bson {
    match value.parse::<i64>() {
        Ok(int) => Bson::Int64(int),
        // Too large for i64; digits always parse as f64.
        Err(_) => Bson::Double(value.parse::<f64>().unwrap_or(f64::INFINITY)),
    }
}
