//! Store Records, Payloads and Errors
//!
//! Defines the stored record shapes, the inbound draft/patch payloads with
//! their validation rules, and the typed store error.
//!
//! Todos are permissive: unknown payload keys are kept verbatim in a
//! passthrough map and echoed back on reads. Tags are the opposite: a narrow
//! schema where unknown keys are dropped and updates are title-only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A task record.
///
/// `order` is omitted from the JSON representation while unset. `extra` holds
/// client-supplied keys outside the schema, flattened back into the object on
/// serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub completed: bool,
    pub tags: Vec<u64>,
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A labeled category. No attribute referencing todos is stored here; the
/// reverse direction is computed on demand from the todo collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub title: String,
    pub url: String,
}

/// A field in a partial payload: absent, explicitly null, or a value.
///
/// `Option<T>` cannot tell "key missing" from "key: null"; this can, which is
/// what lets a patch clear `order` with an explicit null while an absent
/// `order` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// Typed store error. Handlers map these onto HTTP statuses; the store itself
/// never logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Todo not found")]
    TodoNotFound,
    #[error("Tag not found")]
    TagNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("backing store failure: {0}")]
    Backing(String),
}

impl StoreError {
    pub(crate) fn required(field: &str) -> Self {
        StoreError::Validation(format!("\"{field}\" is a required field"))
    }

    pub(crate) fn title_invalid() -> Self {
        StoreError::Validation(
            "\"title\" must be a string with at least one character".to_string(),
        )
    }
}

/// Inbound payload for `create` on the todo collection.
///
/// Every schema field is raw JSON so the store can produce field-specific
/// validation messages instead of a generic deserialization failure; unknown
/// keys collect in `extra`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoDraft {
    #[serde(default)]
    pub title: Patch<Value>,
    #[serde(default)]
    pub order: Patch<Value>,
    #[serde(default)]
    pub completed: Patch<Value>,
    #[serde(default)]
    pub tags: Patch<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A draft that passed validation: what `create` actually inserts, minus the
/// allocator-assigned id and locator.
#[derive(Debug, Clone)]
pub struct ValidTodo {
    pub title: String,
    pub order: Option<i64>,
    pub completed: bool,
    pub tags: Vec<u64>,
    pub extra: Map<String, Value>,
}

impl TodoDraft {
    /// Validates the draft against the current tag collection.
    ///
    /// `title` must be a non-empty string. `tags`, when present, must be a
    /// list of ids each of which `tag_exists` accepts. `completed` is coerced
    /// to a boolean via JSON truthiness. `order` must be an integer when
    /// present. Reserved keys (`id`, `url`) are stripped from the passthrough
    /// set so the allocator-assigned values always win.
    pub fn validate(self, tag_exists: impl Fn(u64) -> bool) -> Result<ValidTodo, StoreError> {
        let title = match self.title {
            Patch::Absent => return Err(StoreError::required("title")),
            Patch::Value(Value::String(title)) if !title.is_empty() => title,
            _ => return Err(StoreError::title_invalid()),
        };

        let tags = match self.tags {
            Patch::Absent => Vec::new(),
            Patch::Value(Value::Array(items)) => checked_tag_ids(&items, &tag_exists)?,
            _ => return Err(tags_not_a_list()),
        };

        let order = match self.order {
            Patch::Absent | Patch::Null => None,
            Patch::Value(value) => Some(integer_order(&value)?),
        };

        let completed = match self.completed {
            Patch::Absent | Patch::Null => false,
            Patch::Value(value) => truthy(&value),
        };

        let mut extra = self.extra;
        extra.remove("id");
        extra.remove("url");

        Ok(ValidTodo {
            title,
            order,
            completed,
            tags,
            extra,
        })
    }
}

/// Inbound payload for `update` on the todo collection. Same wire shape as
/// [`TodoDraft`], but every field is optional and the rules are stricter:
/// `completed` must be an actual boolean, and a null `order` clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoPatch {
    #[serde(default)]
    pub title: Patch<Value>,
    #[serde(default)]
    pub order: Patch<Value>,
    #[serde(default)]
    pub completed: Patch<Value>,
    #[serde(default)]
    pub tags: Patch<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A patch that passed validation. `order` is `Some(None)` for an explicit
/// clear, `None` for untouched.
#[derive(Debug, Clone)]
pub struct TodoChanges {
    title: Option<String>,
    order: Option<Option<i64>>,
    completed: Option<bool>,
    tags: Option<Vec<u64>>,
    extra: Map<String, Value>,
}

impl TodoPatch {
    /// Validates the patch against the current tag collection. Only supplied
    /// keys produce changes; everything else stays untouched on apply.
    pub fn validate(self, tag_exists: impl Fn(u64) -> bool) -> Result<TodoChanges, StoreError> {
        let title = match self.title {
            Patch::Absent => None,
            Patch::Value(Value::String(title)) if !title.is_empty() => Some(title),
            _ => return Err(StoreError::title_invalid()),
        };

        let order = match self.order {
            Patch::Absent => None,
            Patch::Null => Some(None),
            Patch::Value(value) => Some(Some(integer_order(&value)?)),
        };

        let completed = match self.completed {
            Patch::Absent => None,
            Patch::Value(Value::Bool(completed)) => Some(completed),
            _ => {
                return Err(StoreError::Validation(
                    "\"completed\" must be a boolean".to_string(),
                ));
            }
        };

        let tags = match self.tags {
            Patch::Absent => None,
            Patch::Value(Value::Array(items)) => Some(checked_tag_ids(&items, &tag_exists)?),
            _ => return Err(tags_not_a_list()),
        };

        let mut extra = self.extra;
        extra.remove("id");
        extra.remove("url");

        Ok(TodoChanges {
            title,
            order,
            completed,
            tags,
            extra,
        })
    }
}

impl TodoChanges {
    /// Merges the changes into an existing record. Identity (`id`) and the
    /// locator (`url`) never change.
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(order) = self.order {
            todo.order = order;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(tags) = self.tags {
            todo.tags = tags;
        }
        for (key, value) in self.extra {
            todo.extra.insert(key, value);
        }
    }
}

/// Inbound payload for `create` on the tag collection. Narrow schema: unknown
/// keys are dropped on deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagDraft {
    #[serde(default)]
    pub title: Patch<Value>,
}

impl TagDraft {
    pub fn validate(self) -> Result<String, StoreError> {
        match self.title {
            Patch::Absent => Err(StoreError::required("title")),
            Patch::Value(Value::String(title)) if !title.is_empty() => Ok(title),
            _ => Err(StoreError::title_invalid()),
        }
    }
}

/// Inbound payload for `update` on the tag collection. Title-only: every other
/// key in the request body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagPatch {
    #[serde(default)]
    pub title: Patch<Value>,
}

impl TagPatch {
    /// Returns the new title, or `None` when the patch leaves it untouched.
    pub fn validate(self) -> Result<Option<String>, StoreError> {
        match self.title {
            Patch::Absent => Ok(None),
            Patch::Value(Value::String(title)) if !title.is_empty() => Ok(Some(title)),
            _ => Err(StoreError::title_invalid()),
        }
    }
}

/// JSON truthiness: false, null, 0, "", [] and {} are false, everything else
/// is true. Used to coerce `completed` on create.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Parses a `tags` array into ids, deduplicating while preserving first
/// occurrence, and checks each id against the tag collection.
fn checked_tag_ids(
    items: &[Value],
    tag_exists: impl Fn(u64) -> bool,
) -> Result<Vec<u64>, StoreError> {
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item.as_u64().ok_or_else(tags_not_a_list)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    for id in &ids {
        if !tag_exists(*id) {
            return Err(StoreError::Validation(format!(
                "\"tags\" contains an unknown tag id: {id}"
            )));
        }
    }
    Ok(ids)
}

fn tags_not_a_list() -> StoreError {
    StoreError::Validation("\"tags\" must be a list of tag ids".to_string())
}

fn integer_order(value: &Value) -> Result<i64, StoreError> {
    value
        .as_i64()
        .ok_or_else(|| StoreError::Validation("\"order\" must be an integer".to_string()))
}
