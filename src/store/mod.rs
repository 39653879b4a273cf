//! Resource Store Module
//!
//! Owns the two collections (todos and tags) and the association between them.
//!
//! ## Core Concepts
//! - **Contract**: The [`Store`] trait is the only way callers touch the
//!   collections. Handlers receive an `Arc<dyn Store>` and never see the maps.
//! - **Allocation**: New ids are derived from the current maximum id in the
//!   collection (`max + 1`, floor 1), recomputed on every insert.
//! - **Association**: Tag ids live on the todo side only. The reverse
//!   direction ("todos with tag Y") is computed fresh on every query, never
//!   cached, so it can never be stale.
//! - **Dangling references**: Deleting a tag does not touch todos that
//!   reference it; stale ids are filtered out at read time.
//!
//! ## Submodules
//! - **`allocator`**: The `max + 1` id allocation rule.
//! - **`memory`**: Reference backing, plain maps behind one mutex.
//! - **`sqlite`**: SQL backing, one rusqlite connection behind one mutex.
//! - **`types`**: Records, draft/patch payloads, validation, and the error type.

pub mod allocator;
pub mod memory;
pub mod sqlite;
pub mod types;


use std::sync::Arc;

use self::types::{StoreError, Tag, TagDraft, TagPatch, Todo, TodoDraft, TodoPatch};

/// The operation contract both backings implement.
///
/// Every method is a critical section: implementations take one lock spanning
/// both collections for the duration of the call, and validation completes
/// before any mutation begins, so a failed call leaves the store unchanged.
pub trait Store: Send + Sync {
    fn list_todos(&self) -> Result<Vec<Todo>, StoreError>;
    fn get_todo(&self, id: u64) -> Result<Todo, StoreError>;
    fn create_todo(&self, draft: TodoDraft) -> Result<Todo, StoreError>;
    fn update_todo(&self, id: u64, patch: TodoPatch) -> Result<Todo, StoreError>;
    fn delete_todo(&self, id: u64) -> Result<(), StoreError>;
    fn clear_todos(&self) -> Result<(), StoreError>;

    fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
    fn get_tag(&self, id: u64) -> Result<Tag, StoreError>;
    fn create_tag(&self, draft: TagDraft) -> Result<Tag, StoreError>;
    fn update_tag(&self, id: u64, patch: TagPatch) -> Result<Tag, StoreError>;
    fn delete_tag(&self, id: u64) -> Result<(), StoreError>;
    fn clear_tags(&self) -> Result<(), StoreError>;

    /// Appends `tag_id` to the todo's tag set if not already present.
    /// Re-associating is a no-op, not an error.
    fn associate_tag(&self, todo_id: u64, tag_id: u64) -> Result<Todo, StoreError>;
    /// Tag records for every id associated with the todo, skipping ids that
    /// no longer resolve.
    fn tags_of(&self, todo_id: u64) -> Result<Vec<Tag>, StoreError>;
    /// Every todo whose tag set contains `tag_id`. Empty vector when none match.
    fn todos_of(&self, tag_id: u64) -> Result<Vec<Todo>, StoreError>;
}

pub type SharedStore = Arc<dyn Store>;
