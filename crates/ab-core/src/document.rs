//! # Documents
//!
//! The store speaks in schemaless JSON documents grouped by [`Kind`]. Filters,
//! sorts and updates are described here as plain data, and evaluated here too,
//! so every engine applies the same semantics.

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A stored record: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Every document carries its identifier under this field.
pub const ID_FIELD: &str = "_id";

/// The collections a store keeps apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Board,
    Thread,
    Reply,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Board => "board",
            Kind::Thread => "thread",
            Kind::Reply => "reply",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn id_value(id: Uuid) -> Value {
    Value::String(id.to_string())
}

/// Reads a document's `_id`, if it has a well-formed one.
pub fn document_id(doc: &Document) -> Option<Uuid> {
    doc.get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Selects documents of one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Field equals value.
    Eq(String, Value),
    /// Field equals any of the values.
    In(String, Vec<Value>),
    /// Array field holds exactly this value.
    Contains { array: String, value: Value },
    /// Array field holds an embedded object whose `_id` is `element_id`.
    HasElement { array: String, element_id: Uuid },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn ids(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Filter::In(ID_FIELD.to_string(), ids.into_iter().map(id_value).collect())
    }

    pub fn contains(array: &str, value: impl Into<Value>) -> Self {
        Filter::Contains { array: array.to_string(), value: value.into() }
    }

    pub fn has_element(array: &str, element_id: Uuid) -> Self {
        Filter::HasElement { array: array.to_string(), element_id }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => doc.get(field).unwrap_or(&Value::Null) == value,
            Filter::In(field, values) => doc.get(field).is_some_and(|v| values.contains(v)),
            Filter::Contains { array, value } => doc
                .get(array)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
            Filter::HasElement { array, element_id } => doc
                .get(array)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| element_has_id(item, *element_id))),
        }
    }
}

fn element_has_id(item: &Value, id: Uuid) -> bool {
    item.as_object()
        .and_then(|obj| obj.get(ID_FIELD))
        .and_then(Value::as_str)
        .is_some_and(|raw| raw == id.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Orders results by one field; ties fall back to `_id` in the same direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), direction: Direction::Asc }
    }

    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), direction: Direction::Desc }
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = compare_values(a.get(&self.field), b.get(&self.field))
            .then_with(|| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)));
        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// Missing and null sort first, then booleans, numbers, strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum UpdateError {
    #[error("field `{0}` is not an array")]
    NotAnArray(String),
    #[error("no element with id {id} in `{array}`")]
    MissingElement { array: String, id: Uuid },
}

/// One mutation of a single document. A batch of updates is applied
/// all-or-nothing by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Set { field: String, value: Value },
    /// Appends to an array field, creating it if missing.
    Push { array: String, value: Value },
    /// Removes every occurrence of a value from an array field.
    Pull { array: String, value: Value },
    /// Sets a field on the embedded object with the given `_id`.
    SetElement { array: String, element_id: Uuid, field: String, value: Value },
}

impl Update {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        Update::Set { field: field.to_string(), value: value.into() }
    }

    pub fn push(array: &str, value: impl Into<Value>) -> Self {
        Update::Push { array: array.to_string(), value: value.into() }
    }

    pub fn pull(array: &str, value: impl Into<Value>) -> Self {
        Update::Pull { array: array.to_string(), value: value.into() }
    }

    pub fn set_element(array: &str, element_id: Uuid, field: &str, value: impl Into<Value>) -> Self {
        Update::SetElement {
            array: array.to_string(),
            element_id,
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn apply(&self, doc: &mut Document) -> Result<(), UpdateError> {
        match self {
            Update::Set { field, value } => {
                doc.insert(field.clone(), value.clone());
            }
            Update::Push { array, value } => {
                let slot = doc.entry(array.clone()).or_insert_with(|| Value::Array(Vec::new()));
                slot.as_array_mut()
                    .ok_or_else(|| UpdateError::NotAnArray(array.clone()))?
                    .push(value.clone());
            }
            Update::Pull { array, value } => {
                if let Some(slot) = doc.get_mut(array) {
                    slot.as_array_mut()
                        .ok_or_else(|| UpdateError::NotAnArray(array.clone()))?
                        .retain(|item| item != value);
                }
            }
            Update::SetElement { array, element_id, field, value } => {
                let items = doc
                    .get_mut(array)
                    .and_then(Value::as_array_mut)
                    .ok_or_else(|| UpdateError::NotAnArray(array.clone()))?;
                let element = items
                    .iter_mut()
                    .find(|item| element_has_id(item, *element_id))
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| UpdateError::MissingElement { array: array.clone(), id: *element_id })?;
                element.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// Applies a batch to a copy of `doc`, so a failing update leaves it untouched.
pub fn apply_all(doc: &Document, updates: &[Update]) -> Result<Document, UpdateError> {
    let mut next = doc.clone();
    for update in updates {
        update.apply(&mut next)?;
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn filters_match_fields_and_arrays() {
        let reply_id = Uuid::now_v7();
        let thread = doc(json!({
            "_id": "a",
            "reported": true,
            "replies": [{ "_id": reply_id.to_string(), "text": "x" }, "loose-id"]
        }));

        assert!(Filter::All.matches(&thread));
        assert!(Filter::eq("reported", true).matches(&thread));
        assert!(!Filter::eq("reported", false).matches(&thread));
        assert!(Filter::eq("missing", Value::Null).matches(&thread));
        assert!(Filter::In("_id".into(), vec![json!("b"), json!("a")]).matches(&thread));
        assert!(Filter::contains("replies", "loose-id").matches(&thread));
        assert!(Filter::has_element("replies", reply_id).matches(&thread));
        assert!(!Filter::has_element("replies", Uuid::now_v7()).matches(&thread));
    }

    #[test]
    fn sort_breaks_ties_on_id() {
        let a = doc(json!({ "_id": "1", "bumped_on": "2024" }));
        let b = doc(json!({ "_id": "2", "bumped_on": "2024" }));
        let c = doc(json!({ "_id": "0", "bumped_on": "2025" }));

        let mut docs = vec![a.clone(), c.clone(), b.clone()];
        docs.sort_by(|x, y| Sort::desc("bumped_on").compare(x, y));
        assert_eq!(docs, vec![c.clone(), b.clone(), a.clone()]);

        docs.sort_by(|x, y| Sort::asc("bumped_on").compare(x, y));
        assert_eq!(docs, vec![a, b, c]);
    }

    #[test]
    fn updates_mutate_in_place() {
        let reply_id = Uuid::now_v7();
        let original = doc(json!({
            "_id": "t",
            "threads": ["x", "y", "x"],
            "replies": [{ "_id": reply_id.to_string(), "text": "hi" }]
        }));

        let next = apply_all(
            &original,
            &[
                Update::set("reported", true),
                Update::push("threads", "z"),
                Update::pull("threads", "x"),
                Update::set_element("replies", reply_id, "text", "[deleted]"),
            ],
        )
        .unwrap();

        assert_eq!(next["reported"], json!(true));
        assert_eq!(next["threads"], json!(["y", "z"]));
        assert_eq!(next["replies"][0]["text"], json!("[deleted]"));
    }

    #[test]
    fn failed_batch_leaves_document_untouched() {
        let original = doc(json!({ "_id": "t", "text": "keep", "replies": [] }));
        let result = apply_all(
            &original,
            &[
                Update::set("text", "changed"),
                Update::set_element("replies", Uuid::now_v7(), "text", "x"),
            ],
        );
        assert!(matches!(result, Err(UpdateError::MissingElement { .. })));
        assert_eq!(original["text"], json!("keep"));
    }

    #[test]
    fn push_onto_scalar_is_rejected() {
        let mut target = doc(json!({ "name": "b" }));
        assert_eq!(
            Update::push("name", "x").apply(&mut target),
            Err(UpdateError::NotAnArray("name".into()))
        );
    }
}
