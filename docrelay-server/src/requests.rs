//! Typed request schemas for each endpoint.
//!
//! Query strings and JSON bodies are validated into these types before any database
//! interaction, so every malformed request ends with a `400` and no connection is opened.

use bson::{Bson, Document, oid::ObjectId};
use serde_json::{Map, Value};
use tracing::warn;

use docrelay::{
    filter,
    identity::{self, ID_FIELD},
    projection::Projection,
    query::{Expr, Filter, Query},
};

use crate::{
    error::{ApiError, ApiResult},
    json,
};

/// Value of `deleteAll` that confirms deleting every document in a collection.
pub const DELETE_ALL_CONFIRMATION: &str = "message2u";

/// The `(database, collection)` a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub db: String,
    pub collection: String,
}

impl Namespace {
    fn from_body(body: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            db: text(body, "db")?,
            collection: text(body, "collection")?,
        })
    }
}

/// `GET /read` parameters.
#[derive(Debug, Clone)]
pub struct ReadParams {
    pub namespace: Namespace,
    params: Vec<(String, String)>,
}

impl ReadParams {
    /// Validates the raw query-string pairs. Later duplicates of `db` and `collection` win.
    pub fn from_pairs(params: Vec<(String, String)>) -> ApiResult<Self> {
        let last = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.clone())
        };

        match (last("db"), last("collection")) {
            (Some(db), Some(collection)) => Ok(Self {
                namespace: Namespace { db, collection },
                params,
            }),
            _ => Err(ApiError::Validation("Missing \"db\" or \"collection\" parameter".into())),
        }
    }

    /// Builds the find query: every non-reserved parameter is a filter and `fields` is the
    /// projection.
    pub fn query(&self) -> ApiResult<Query> {
        let fields = self
            .params
            .iter()
            .rev()
            .find(|(key, _)| key == "fields")
            .map(|(_, value)| value.as_str());

        Ok(Query::builder()
            .maybe_filter(filter::translate(self.params.iter().map(|(k, v)| (k, v)))?)
            .projection(Projection::parse(fields))
            .build())
    }
}

/// `POST /insert` body: `{db, collection, items: [object, ...]}`.
#[derive(Debug, Clone)]
pub struct InsertRequest {
    pub namespace: Namespace,
    pub items: Vec<Document>,
}

impl InsertRequest {
    pub fn parse(body: Value) -> ApiResult<Self> {
        let (namespace, items) = namespace_and_items(&body)?;

        if items.is_empty() {
            return Err(ApiError::Validation("No valid items provided".into()));
        }

        Ok(Self {
            namespace,
            items: items
                .iter()
                .map(|item| json::to_document(item, "Insert items must be objects"))
                .collect::<ApiResult<Vec<_>>>()?,
        })
    }
}

/// One entry of an update batch after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateItem {
    /// Set `fields` on the document identified by `id`.
    Apply { id: ObjectId, fields: Document },
    /// The item cannot be applied; reported back as a per-item error.
    Rejected(String),
}

impl UpdateItem {
    fn parse(item: &Value) -> Self {
        let Some(object) = item.as_object() else {
            return Self::Rejected("Update item must be an object".into());
        };

        let raw_id = match object.get("id") {
            None | Some(Value::Null) => return Self::Rejected("Missing \"id\" in update object".into()),
            Some(Value::String(id)) if id.is_empty() => {
                return Self::Rejected("Missing \"id\" in update object".into());
            }
            Some(Value::String(id)) => id.clone(),
            Some(other) => other.to_string(),
        };

        let Some(id) = identity::parse_id(&raw_id) else {
            return Self::Rejected(format!("Invalid id \"{raw_id}\""));
        };

        let mut fields = Document::new();

        for (key, value) in object.iter().filter(|(key, _)| key.as_str() != "id") {
            match json::to_bson(value) {
                Ok(value) => {
                    fields.insert(key.clone(), value);
                }
                Err(e) => return Self::Rejected(e.to_string()),
            }
        }

        if fields.is_empty() {
            return Self::Rejected(format!("No fields to update for id \"{raw_id}\""));
        }

        Self::Apply { id, fields }
    }
}

/// `POST /update` body: `{db, collection, items: [{id, ...fields}, ...]}`.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub namespace: Namespace,
    /// Items in input order, including the rejected ones.
    pub items: Vec<UpdateItem>,
}

impl UpdateRequest {
    pub fn parse(body: Value) -> ApiResult<Self> {
        let (namespace, items) = namespace_and_items(&body)?;
        let items = items.iter().map(UpdateItem::parse).collect::<Vec<_>>();

        if !items.iter().any(|item| matches!(item, UpdateItem::Apply { .. })) {
            return Err(ApiError::Validation("No valid items provided".into()));
        }

        Ok(Self { namespace, items })
    }
}

/// How a delete request selects documents.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteSelector {
    /// Documents whose identity is listed.
    Ids(Vec<ObjectId>),
    /// Every document in the collection.
    All,
    /// Documents where every `(field, value)` equality holds.
    Matching(Vec<(String, Bson)>),
}

impl DeleteSelector {
    /// The filter selecting the documents to delete; `None` selects everything.
    pub fn filter(&self) -> Option<Expr> {
        match self {
            DeleteSelector::Ids(ids) => Some(Filter::any_of(ID_FIELD, ids.iter().copied())),
            DeleteSelector::All => None,
            DeleteSelector::Matching(conditions) => Some(Filter::and(
                conditions
                    .iter()
                    .map(|(field, value)| Filter::eq(field.clone(), value.clone())),
            )),
        }
    }
}

/// `POST /delete` body.
///
/// Selection modes, in order of precedence: `ids` (alias `items`), `deleteAll`, then the
/// equality conditions `trxndate` and `match`.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub namespace: Namespace,
    pub selector: DeleteSelector,
}

impl DeleteRequest {
    pub fn parse(body: Value) -> ApiResult<Self> {
        let body = object(&body)?;
        let namespace = Namespace::from_body(body)
            .ok_or_else(|| ApiError::Validation("Missing \"db\" or \"collection\" in request body".into()))?;

        Ok(Self {
            namespace,
            selector: Self::selector(body)?,
        })
    }

    fn selector(body: &Map<String, Value>) -> ApiResult<DeleteSelector> {
        if let Some(ids) = present(body, "ids").or_else(|| present(body, "items")) {
            let ids = ids
                .as_array()
                .ok_or_else(|| ApiError::Validation("\"ids\" must be an array".into()))?;
            let parsed = identity::parse_ids(ids);

            if !parsed.rejected.is_empty() {
                warn!(rejected = ?parsed.rejected, "Skipping malformed ids in delete request");
            }

            if parsed.valid.is_empty() {
                return Err(ApiError::Validation("No valid IDs provided".into()));
            }

            return Ok(DeleteSelector::Ids(parsed.valid));
        }

        if let Some(confirmation) = present(body, "deleteAll") {
            return match confirmation.as_str() {
                Some(DELETE_ALL_CONFIRMATION) => Ok(DeleteSelector::All),
                _ => Err(ApiError::Validation("Invalid \"deleteAll\" confirmation".into())),
            };
        }

        let mut conditions = Vec::new();

        if let Some(date) = present(body, "trxndate") {
            conditions.push(("trxndate".to_string(), json::to_bson(date)?));
        }

        if let Some(matching) = present(body, "match") {
            let matching = matching
                .as_object()
                .ok_or_else(|| ApiError::Validation("\"match\" must be an object".into()))?;

            for (field, value) in matching {
                filter::check_field_name(field)?;
                conditions.push((field.clone(), json::to_bson(value)?));
            }
        }

        if conditions.is_empty() {
            return Err(ApiError::Validation(
                "Missing \"ids\", \"deleteAll\", \"trxndate\" or \"match\" in request body".into(),
            ));
        }

        Ok(DeleteSelector::Matching(conditions))
    }
}

fn object(body: &Value) -> ApiResult<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| ApiError::Validation("Request body must be a JSON object".into()))
}

fn present<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    body.get(key).filter(|value| !value.is_null())
}

fn text(body: &Map<String, Value>, key: &str) -> Option<String> {
    present(body, key)?
        .as_str()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn namespace_and_items(body: &Value) -> ApiResult<(Namespace, &Vec<Value>)> {
    let body = object(body)?;
    let missing = || ApiError::Validation("Missing \"db\", \"collection\", or \"items\" in request body".into());

    let namespace = Namespace::from_body(body).ok_or_else(missing)?;
    let items = present(body, "items").ok_or_else(missing)?;

    let items = items
        .as_array()
        .ok_or_else(|| ApiError::Validation("\"items\" must be an array".into()))?;

    Ok((namespace, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ID: &str = "573a1390f29313caabcd4135";

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn rejection(result: ApiResult<impl std::fmt::Debug>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn read_requires_db_and_collection() {
        assert_eq!(
            rejection(ReadParams::from_pairs(pairs(&[("db", "sample_mflix"), ("collection", "")]))),
            "Missing \"db\" or \"collection\" parameter"
        );
    }

    #[test]
    fn read_query_excludes_reserved_parameters() {
        let params = ReadParams::from_pairs(pairs(&[
            ("db", "sample_mflix"),
            ("collection", "users"),
            ("fields", "name, email"),
            ("name", "john"),
        ]))
        .unwrap();
        let query = params.query().unwrap();

        assert_eq!(params.namespace.collection, "users");
        assert_eq!(query.projection.to_document(), doc! { "name": 1, "email": 1 });
        assert_eq!(
            query.filter,
            Some(Filter::and([Filter::matches("name", "john")]))
        );
    }

    #[test]
    fn read_query_rejects_non_numeric_bounds() {
        let params = ReadParams::from_pairs(pairs(&[
            ("db", "sample_mflix"),
            ("collection", "movies"),
            ("year", "gteabc"),
        ]))
        .unwrap();

        assert!(matches!(params.query(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn insert_validates_items() {
        assert_eq!(
            rejection(InsertRequest::parse(json!({ "db": "d", "collection": "c" }))),
            "Missing \"db\", \"collection\", or \"items\" in request body"
        );
        assert_eq!(
            rejection(InsertRequest::parse(json!({ "db": "d", "collection": "c", "items": {} }))),
            "\"items\" must be an array"
        );
        assert_eq!(
            rejection(InsertRequest::parse(json!({ "db": "d", "collection": "c", "items": [] }))),
            "No valid items provided"
        );
        assert_eq!(
            rejection(InsertRequest::parse(json!({ "db": "d", "collection": "c", "items": [{ "a": 1 }, 2] }))),
            "Insert items must be objects"
        );
        assert_eq!(
            rejection(InsertRequest::parse(json!(["not", "an", "object"]))),
            "Request body must be a JSON object"
        );
    }

    #[test]
    fn update_items_are_validated_individually() {
        let request = UpdateRequest::parse(json!({
            "db": "d",
            "collection": "c",
            "items": [
                { "id": ID, "name": "Ned" },
                { "name": "no id" },
                { "id": "nope", "name": "bad id" },
                { "id": ID },
                "scalar",
            ],
        }))
        .unwrap();

        assert_eq!(
            request.items,
            vec![
                UpdateItem::Apply {
                    id: ObjectId::parse_str(ID).unwrap(),
                    fields: doc! { "name": "Ned" },
                },
                UpdateItem::Rejected("Missing \"id\" in update object".into()),
                UpdateItem::Rejected("Invalid id \"nope\"".into()),
                UpdateItem::Rejected(format!("No fields to update for id \"{ID}\"")),
                UpdateItem::Rejected("Update item must be an object".into()),
            ]
        );
    }

    #[test]
    fn update_without_applicable_items_is_rejected() {
        assert_eq!(
            rejection(UpdateRequest::parse(json!({
                "db": "d",
                "collection": "c",
                "items": [{ "id": "nope", "name": "x" }],
            }))),
            "No valid items provided"
        );
    }

    #[test]
    fn delete_selectors_follow_precedence() {
        let selector = |body: Value| DeleteRequest::parse(body).map(|request| request.selector);

        assert_eq!(
            selector(json!({ "db": "d", "collection": "c", "ids": [ID, "bad"], "deleteAll": "message2u" })).unwrap(),
            DeleteSelector::Ids(vec![ObjectId::parse_str(ID).unwrap()])
        );
        assert_eq!(
            selector(json!({ "db": "d", "collection": "c", "items": [ID] })).unwrap(),
            DeleteSelector::Ids(vec![ObjectId::parse_str(ID).unwrap()])
        );
        assert_eq!(
            selector(json!({ "db": "d", "collection": "c", "deleteAll": "message2u", "trxndate": "2024-01-01" })).unwrap(),
            DeleteSelector::All
        );
        assert_eq!(
            selector(json!({ "db": "d", "collection": "c", "trxndate": "2024-01-01", "match": { "branch": 7 } })).unwrap(),
            DeleteSelector::Matching(vec![
                ("trxndate".into(), Bson::String("2024-01-01".into())),
                ("branch".into(), Bson::Int64(7)),
            ])
        );
    }

    #[test]
    fn delete_rejects_unusable_selectors() {
        assert_eq!(
            rejection(DeleteRequest::parse(json!({ "db": "d", "collection": "c", "ids": ["bad", 4] }))),
            "No valid IDs provided"
        );
        assert_eq!(
            rejection(DeleteRequest::parse(json!({ "db": "d", "collection": "c", "deleteAll": true }))),
            "Invalid \"deleteAll\" confirmation"
        );
        assert_eq!(
            rejection(DeleteRequest::parse(json!({ "db": "d", "collection": "c" }))),
            "Missing \"ids\", \"deleteAll\", \"trxndate\" or \"match\" in request body"
        );
        assert_eq!(
            rejection(DeleteRequest::parse(json!({ "collection": "c", "deleteAll": "message2u" }))),
            "Missing \"db\" or \"collection\" in request body"
        );
    }

    #[test]
    fn delete_conditions_compare_values_literally() {
        let request = DeleteRequest::parse(json!({ "db": "d", "collection": "c", "trxndate": { "$exists": true } })).unwrap();

        assert_eq!(
            request.selector,
            DeleteSelector::Matching(vec![("trxndate".into(), Bson::Document(doc! { "$exists": true }))])
        );
        assert_eq!(
            request.selector.filter(),
            Some(Filter::and([Filter::eq("trxndate", doc! { "$exists": true })]))
        );
    }

    #[test]
    fn delete_rejects_operator_match_keys() {
        for key in ["$where", "$or", "branch.$gt"] {
            let matching = Map::from_iter([(key.to_string(), json!("x"))]);
            let result = DeleteRequest::parse(json!({ "db": "d", "collection": "c", "match": matching }));

            assert!(matches!(result, Err(ApiError::Validation(_))), "{key} should be rejected");
        }
    }

    #[test]
    fn delete_all_selects_everything() {
        assert_eq!(DeleteSelector::All.filter(), None);
    }
}
