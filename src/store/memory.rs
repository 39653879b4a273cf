//! In-Memory Backing
//!
//! The reference implementation of the [`Store`] contract: two plain maps
//! behind one mutex. The single lock spans both collections because the
//! association operations touch both; validation runs to completion under the
//! lock before any mutation, so a failed call leaves the maps unchanged.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::allocator;
use super::types::{StoreError, Tag, TagDraft, TagPatch, Todo, TodoDraft, TodoPatch};
use super::Store;

pub struct MemoryStore {
    inner: Mutex<Collections>,
    base_url: String,
}

#[derive(Default)]
struct Collections {
    todos: BTreeMap<u64, Todo>,
    tags: BTreeMap<u64, Tag>,
}

impl MemoryStore {
    /// Creates an empty store. `base_url` is the prefix for the `url` locator
    /// minted at create time, e.g. `http://127.0.0.1:8081`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Collections::default()),
            base_url: base_url.into(),
        }
    }
}

impl Store for MemoryStore {
    fn list_todos(&self) -> Result<Vec<Todo>, StoreError> {
        Ok(self.inner.lock().todos.values().cloned().collect())
    }

    fn get_todo(&self, id: u64) -> Result<Todo, StoreError> {
        self.inner
            .lock()
            .todos
            .get(&id)
            .cloned()
            .ok_or(StoreError::TodoNotFound)
    }

    fn create_todo(&self, draft: TodoDraft) -> Result<Todo, StoreError> {
        let mut inner = self.inner.lock();
        let valid = draft.validate(|id| inner.tags.contains_key(&id))?;

        let id = allocator::next_id(inner.todos.keys().copied());
        let todo = Todo {
            id,
            title: valid.title,
            order: valid.order,
            completed: valid.completed,
            tags: valid.tags,
            url: format!("{}/todos/{}", self.base_url, id),
            extra: valid.extra,
        };
        inner.todos.insert(id, todo.clone());
        Ok(todo)
    }

    fn update_todo(&self, id: u64, patch: TodoPatch) -> Result<Todo, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.todos.contains_key(&id) {
            return Err(StoreError::TodoNotFound);
        }
        let changes = patch.validate(|tag_id| inner.tags.contains_key(&tag_id))?;

        // Presence was checked above under the same lock.
        let todo = inner.todos.get_mut(&id).ok_or(StoreError::TodoNotFound)?;
        changes.apply(todo);
        Ok(todo.clone())
    }

    fn delete_todo(&self, id: u64) -> Result<(), StoreError> {
        match self.inner.lock().todos.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::TodoNotFound),
        }
    }

    fn clear_todos(&self) -> Result<(), StoreError> {
        self.inner.lock().todos.clear();
        Ok(())
    }

    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        Ok(self.inner.lock().tags.values().cloned().collect())
    }

    fn get_tag(&self, id: u64) -> Result<Tag, StoreError> {
        self.inner
            .lock()
            .tags
            .get(&id)
            .cloned()
            .ok_or(StoreError::TagNotFound)
    }

    fn create_tag(&self, draft: TagDraft) -> Result<Tag, StoreError> {
        let title = draft.validate()?;

        let mut inner = self.inner.lock();
        let id = allocator::next_id(inner.tags.keys().copied());
        let tag = Tag {
            id,
            title,
            url: format!("{}/tags/{}", self.base_url, id),
        };
        inner.tags.insert(id, tag.clone());
        Ok(tag)
    }

    fn update_tag(&self, id: u64, patch: TagPatch) -> Result<Tag, StoreError> {
        let mut inner = self.inner.lock();
        let tag = inner.tags.get_mut(&id).ok_or(StoreError::TagNotFound)?;
        if let Some(title) = patch.validate()? {
            tag.title = title;
        }
        Ok(tag.clone())
    }

    fn delete_tag(&self, id: u64) -> Result<(), StoreError> {
        // No cascade: todos referencing this tag keep the id; reads filter it.
        match self.inner.lock().tags.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::TagNotFound),
        }
    }

    fn clear_tags(&self) -> Result<(), StoreError> {
        self.inner.lock().tags.clear();
        Ok(())
    }

    fn associate_tag(&self, todo_id: u64, tag_id: u64) -> Result<Todo, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.todos.contains_key(&todo_id) {
            return Err(StoreError::TodoNotFound);
        }
        if !inner.tags.contains_key(&tag_id) {
            return Err(StoreError::TagNotFound);
        }

        let todo = inner
            .todos
            .get_mut(&todo_id)
            .ok_or(StoreError::TodoNotFound)?;
        if !todo.tags.contains(&tag_id) {
            todo.tags.push(tag_id);
        }
        Ok(todo.clone())
    }

    fn tags_of(&self, todo_id: u64) -> Result<Vec<Tag>, StoreError> {
        let inner = self.inner.lock();
        let todo = inner.todos.get(&todo_id).ok_or(StoreError::TodoNotFound)?;
        Ok(todo
            .tags
            .iter()
            .filter_map(|tag_id| inner.tags.get(tag_id).cloned())
            .collect())
    }

    fn todos_of(&self, tag_id: u64) -> Result<Vec<Todo>, StoreError> {
        let inner = self.inner.lock();
        if !inner.tags.contains_key(&tag_id) {
            return Err(StoreError::TagNotFound);
        }
        Ok(inner
            .todos
            .values()
            .filter(|todo| todo.tags.contains(&tag_id))
            .cloned()
            .collect())
    }
}
