//! HTTP API Module
//!
//! The transport layer for the resource store.
//!
//! ## Overview
//! Routes the todo-backend surface onto the store contract and maps typed
//! store errors onto HTTP statuses. The store is injected into handlers via
//! the router's extension layer, so either backing can sit behind the same
//! routes.
//!
//! ## Submodules
//! - **`handlers`**: Request handlers for the Axum web server.

pub mod handlers;


use axum::extract::Extension;
use axum::routing::get;
use axum::Router;

use crate::store::SharedStore;
use self::handlers::*;

/// Builds the application router over a store.
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route(
            "/todos/",
            get(handle_list_todos)
                .post(handle_create_todo)
                .delete(handle_clear_todos),
        )
        .route(
            "/todos/:id",
            get(handle_get_todo)
                .patch(handle_update_todo)
                .delete(handle_delete_todo),
        )
        .route(
            "/todos/:id/tags/",
            get(handle_todo_tags).post(handle_associate_tag),
        )
        .route(
            "/tags/",
            get(handle_list_tags)
                .post(handle_create_tag)
                .delete(handle_clear_tags),
        )
        .route(
            "/tags/:id",
            get(handle_get_tag)
                .patch(handle_update_tag)
                .delete(handle_delete_tag),
        )
        .route("/tags/:id/todos/", get(handle_tag_todos))
        .layer(Extension(store))
}
