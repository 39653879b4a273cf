//! Request handlers.
//!
//! Each handler extracts the payload, calls one store operation, and maps the
//! result onto the response shape. All error bodies are `{"error": "<msg>"}`.
//! Request bodies are extracted as `Result<Json<T>, JsonRejection>` so an
//! unparsable body becomes a structured 400 instead of a default rejection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::store::types::{StoreError, TagDraft, TagPatch, TodoDraft, TodoPatch};
use crate::store::SharedStore;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_body(message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        error: message.into(),
    }
}

fn store_error_response(err: StoreError) -> Response {
    let status = match &err {
        StoreError::TodoNotFound | StoreError::TagNotFound => StatusCode::NOT_FOUND,
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::Backing(message) => {
            tracing::error!("Backing store failure: {}", message);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(error_body(err.to_string()))).into_response()
}

fn rejected_body(rejection: JsonRejection) -> Response {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(error_body("malformed request body")),
    )
        .into_response()
}

// ---- Todos ----

pub async fn handle_list_todos(Extension(store): Extension<SharedStore>) -> Response {
    match store.list_todos() {
        Ok(todos) => (StatusCode::OK, Json(todos)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_clear_todos(Extension(store): Extension<SharedStore>) -> Response {
    match store.clear_todos() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_create_todo(
    Extension(store): Extension<SharedStore>,
    payload: Result<Json<TodoDraft>, JsonRejection>,
) -> Response {
    let Json(draft) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejected_body(rejection),
    };

    match store.create_todo(draft) {
        Ok(todo) => {
            tracing::debug!("Created todo {}", todo.id);
            (StatusCode::SEE_OTHER, [(header::LOCATION, todo.url)]).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_get_todo(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
) -> Response {
    match store.get_todo(id) {
        Ok(todo) => (StatusCode::OK, Json(todo)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_update_todo(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
    payload: Result<Json<TodoPatch>, JsonRejection>,
) -> Response {
    let Json(patch) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejected_body(rejection),
    };

    match store.update_todo(id, patch) {
        Ok(todo) => (StatusCode::OK, Json(todo)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_delete_todo(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
) -> Response {
    match store.delete_todo(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error_response(err),
    }
}

// ---- Tags ----

pub async fn handle_list_tags(Extension(store): Extension<SharedStore>) -> Response {
    match store.list_tags() {
        Ok(tags) => (StatusCode::OK, Json(tags)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_clear_tags(Extension(store): Extension<SharedStore>) -> Response {
    match store.clear_tags() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_create_tag(
    Extension(store): Extension<SharedStore>,
    payload: Result<Json<TagDraft>, JsonRejection>,
) -> Response {
    let Json(draft) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejected_body(rejection),
    };

    match store.create_tag(draft) {
        Ok(tag) => {
            tracing::debug!("Created tag {}", tag.id);
            (StatusCode::CREATED, Json(tag)).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_get_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
) -> Response {
    match store.get_tag(id) {
        Ok(tag) => (StatusCode::OK, Json(tag)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_update_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
    payload: Result<Json<TagPatch>, JsonRejection>,
) -> Response {
    let Json(patch) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejected_body(rejection),
    };

    match store.update_tag(id, patch) {
        Ok(tag) => (StatusCode::OK, Json(tag)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_delete_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
) -> Response {
    match store.delete_tag(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error_response(err),
    }
}

// ---- Associations ----

#[derive(Debug, Deserialize)]
pub struct AssociateBody {
    #[serde(default)]
    pub tag_id: Option<u64>,
}

pub async fn handle_associate_tag(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
    payload: Result<Json<AssociateBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => return rejected_body(rejection),
    };
    let Some(tag_id) = body.tag_id else {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body("\"tag_id\" is a required field")),
        )
            .into_response();
    };

    match store.associate_tag(id, tag_id) {
        Ok(todo) => (StatusCode::OK, Json(todo)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_todo_tags(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
) -> Response {
    match store.tags_of(id) {
        Ok(tags) => (StatusCode::OK, Json(tags)).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub async fn handle_tag_todos(
    Extension(store): Extension<SharedStore>,
    Path(id): Path<u64>,
) -> Response {
    match store.todos_of(id) {
        Ok(todos) => (StatusCode::OK, Json(todos)).into_response(),
        Err(err) => store_error_response(err),
    }
}
