//! Todo Backend Library
//!
//! This library crate defines the core modules of the todo/tag resource server.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of two loosely coupled subsystems:
//!
//! - **`store`**: The in-process resource store. It owns the todo and tag
//!   collections, allocates identifiers, validates payload shape, and maintains
//!   the tag↔todo association. Two interchangeable backings implement one
//!   contract: an in-memory map store and a SQLite adapter.
//! - **`api`**: The HTTP transport layer. Axum request handlers that translate
//!   verbs/paths/bodies into store calls and store results into HTTP responses.

pub mod api;
pub mod store;
