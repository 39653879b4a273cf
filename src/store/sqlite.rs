//! SQLite Backing
//!
//! The same [`Store`] contract translated to SQL: one rusqlite connection
//! behind one mutex, every mutating operation inside a transaction. The tag
//! set and the passthrough keys live in JSON columns on the todo row, so both
//! backings share the validation and merge logic in `types`.
//!
//! Id allocation queries `MAX(id)` inside the operation's transaction and
//! feeds it through the shared allocator, keeping the SQL backing observably
//! equivalent to the in-memory one, including the post-clear floor.

use std::collections::HashSet;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use super::allocator;
use super::types::{StoreError, Tag, TagDraft, TagPatch, Todo, TodoDraft, TodoPatch};
use super::Store;

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("migrations/0001_init.sql"),
}];

pub struct SqliteStore {
    conn: Mutex<Connection>,
    base_url: String,
}

impl SqliteStore {
    /// Opens (creating if needed) a database file and applies pending
    /// migrations.
    pub fn open(path: impl AsRef<Path>, base_url: impl Into<String>) -> Result<Self, StoreError> {
        let mut conn = Connection::open(path)?;
        bootstrap(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            base_url: base_url.into(),
        })
    }

    /// Opens an in-memory database. Used by tests.
    pub fn open_in_memory(base_url: impl Into<String>) -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        bootstrap(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            base_url: base_url.into(),
        })
    }
}

fn bootstrap(conn: &mut Connection) -> Result<(), StoreError> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

/// Applies pending migrations, mirroring the applied version to
/// `PRAGMA user_version`.
fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;
    Ok(())
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backing(err.to_string())
    }
}

fn json_column<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|err| StoreError::Backing(err.to_string()))
}

/// Raw todo row; the JSON columns are decoded in a second step so rusqlite
/// row-mapping errors and JSON errors stay distinguishable.
struct TodoRow {
    id: i64,
    title: String,
    order: Option<i64>,
    completed: bool,
    tags: String,
    url: String,
    extra: String,
}

const TODO_COLUMNS: &str = r#"id, title, "order", completed, tags, url, extra"#;

fn todo_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TodoRow> {
    Ok(TodoRow {
        id: row.get(0)?,
        title: row.get(1)?,
        order: row.get(2)?,
        completed: row.get(3)?,
        tags: row.get(4)?,
        url: row.get(5)?,
        extra: row.get(6)?,
    })
}

fn decode_todo(row: TodoRow) -> Result<Todo, StoreError> {
    Ok(Todo {
        id: row.id as u64,
        title: row.title,
        order: row.order,
        completed: row.completed,
        tags: json_column(&row.tags)?,
        url: row.url,
        extra: json_column(&row.extra)?,
    })
}

fn tag_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get::<_, i64>(0)? as u64,
        title: row.get(1)?,
        url: row.get(2)?,
    })
}

fn fetch_todo(tx: &Transaction<'_>, id: u64) -> Result<Option<Todo>, StoreError> {
    let row = tx
        .query_row(
            &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
            params![id as i64],
            todo_row,
        )
        .optional()?;
    row.map(decode_todo).transpose()
}

fn tag_exists(tx: &Transaction<'_>, id: u64) -> Result<bool, StoreError> {
    let found = tx
        .query_row(
            "SELECT 1 FROM tags WHERE id = ?1",
            params![id as i64],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn existing_tag_ids(tx: &Transaction<'_>) -> Result<HashSet<u64>, StoreError> {
    let mut stmt = tx.prepare("SELECT id FROM tags")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(ids.into_iter().map(|id| id as u64).collect())
}

fn next_todo_id(tx: &Transaction<'_>) -> Result<u64, StoreError> {
    let max: Option<i64> = tx.query_row("SELECT MAX(id) FROM todos", [], |row| row.get(0))?;
    Ok(allocator::next_id(max.map(|id| id as u64)))
}

fn next_tag_id(tx: &Transaction<'_>) -> Result<u64, StoreError> {
    let max: Option<i64> = tx.query_row("SELECT MAX(id) FROM tags", [], |row| row.get(0))?;
    Ok(allocator::next_id(max.map(|id| id as u64)))
}

fn write_todo(tx: &Transaction<'_>, todo: &Todo, insert: bool) -> Result<(), StoreError> {
    let tags = serde_json::to_string(&todo.tags).map_err(|err| StoreError::Backing(err.to_string()))?;
    let extra =
        serde_json::to_string(&todo.extra).map_err(|err| StoreError::Backing(err.to_string()))?;
    let sql = if insert {
        r#"INSERT INTO todos (id, title, "order", completed, tags, url, extra)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#
    } else {
        r#"UPDATE todos SET title = ?2, "order" = ?3, completed = ?4, tags = ?5,
           url = ?6, extra = ?7 WHERE id = ?1"#
    };
    tx.execute(
        sql,
        params![
            todo.id as i64,
            todo.title,
            todo.order,
            todo.completed,
            tags,
            todo.url,
            extra
        ],
    )?;
    Ok(())
}

impl Store for SqliteStore {
    fn list_todos(&self) -> Result<Vec<Todo>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {TODO_COLUMNS} FROM todos"))?;
        let rows = stmt
            .query_map([], todo_row)?
            .collect::<rusqlite::Result<Vec<TodoRow>>>()?;
        rows.into_iter().map(decode_todo).collect()
    }

    fn get_todo(&self, id: u64) -> Result<Todo, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        fetch_todo(&tx, id)?.ok_or(StoreError::TodoNotFound)
    }

    fn create_todo(&self, draft: TodoDraft) -> Result<Todo, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let known_tags = existing_tag_ids(&tx)?;
        let valid = draft.validate(|id| known_tags.contains(&id))?;

        let id = next_todo_id(&tx)?;
        let todo = Todo {
            id,
            title: valid.title,
            order: valid.order,
            completed: valid.completed,
            tags: valid.tags,
            url: format!("{}/todos/{}", self.base_url, id),
            extra: valid.extra,
        };
        write_todo(&tx, &todo, true)?;
        tx.commit()?;
        Ok(todo)
    }

    fn update_todo(&self, id: u64, patch: TodoPatch) -> Result<Todo, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut todo = fetch_todo(&tx, id)?.ok_or(StoreError::TodoNotFound)?;
        let known_tags = existing_tag_ids(&tx)?;
        let changes = patch.validate(|tag_id| known_tags.contains(&tag_id))?;
        changes.apply(&mut todo);

        write_todo(&tx, &todo, false)?;
        tx.commit()?;
        Ok(todo)
    }

    fn delete_todo(&self, id: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM todos WHERE id = ?1", params![id as i64])?;
        if affected == 0 {
            return Err(StoreError::TodoNotFound);
        }
        Ok(())
    }

    fn clear_todos(&self) -> Result<(), StoreError> {
        self.conn.lock().execute("DELETE FROM todos", [])?;
        Ok(())
    }

    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, title, url FROM tags")?;
        let tags = stmt
            .query_map([], tag_row)?
            .collect::<rusqlite::Result<Vec<Tag>>>()?;
        Ok(tags)
    }

    fn get_tag(&self, id: u64) -> Result<Tag, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, title, url FROM tags WHERE id = ?1",
            params![id as i64],
            tag_row,
        )
        .optional()?
        .ok_or(StoreError::TagNotFound)
    }

    fn create_tag(&self, draft: TagDraft) -> Result<Tag, StoreError> {
        let title = draft.validate()?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let id = next_tag_id(&tx)?;
        let tag = Tag {
            id,
            title,
            url: format!("{}/tags/{}", self.base_url, id),
        };
        tx.execute(
            "INSERT INTO tags (id, title, url) VALUES (?1, ?2, ?3)",
            params![tag.id as i64, tag.title, tag.url],
        )?;
        tx.commit()?;
        Ok(tag)
    }

    fn update_tag(&self, id: u64, patch: TagPatch) -> Result<Tag, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut tag = tx
            .query_row(
                "SELECT id, title, url FROM tags WHERE id = ?1",
                params![id as i64],
                tag_row,
            )
            .optional()?
            .ok_or(StoreError::TagNotFound)?;

        if let Some(title) = patch.validate()? {
            tag.title = title;
            tx.execute(
                "UPDATE tags SET title = ?2 WHERE id = ?1",
                params![id as i64, tag.title],
            )?;
        }
        tx.commit()?;
        Ok(tag)
    }

    fn delete_tag(&self, id: u64) -> Result<(), StoreError> {
        // No cascade into todos.tags; stale ids are filtered at read time.
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM tags WHERE id = ?1", params![id as i64])?;
        if affected == 0 {
            return Err(StoreError::TagNotFound);
        }
        Ok(())
    }

    fn clear_tags(&self) -> Result<(), StoreError> {
        self.conn.lock().execute("DELETE FROM tags", [])?;
        Ok(())
    }

    fn associate_tag(&self, todo_id: u64, tag_id: u64) -> Result<Todo, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let mut todo = fetch_todo(&tx, todo_id)?.ok_or(StoreError::TodoNotFound)?;
        if !tag_exists(&tx, tag_id)? {
            return Err(StoreError::TagNotFound);
        }

        if !todo.tags.contains(&tag_id) {
            todo.tags.push(tag_id);
            write_todo(&tx, &todo, false)?;
        }
        tx.commit()?;
        Ok(todo)
    }

    fn tags_of(&self, todo_id: u64) -> Result<Vec<Tag>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let todo = fetch_todo(&tx, todo_id)?.ok_or(StoreError::TodoNotFound)?;
        let mut tags = Vec::new();
        for tag_id in &todo.tags {
            let tag = tx
                .query_row(
                    "SELECT id, title, url FROM tags WHERE id = ?1",
                    params![*tag_id as i64],
                    tag_row,
                )
                .optional()?;
            if let Some(tag) = tag {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    fn todos_of(&self, tag_id: u64) -> Result<Vec<Todo>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        if !tag_exists(&tx, tag_id)? {
            return Err(StoreError::TagNotFound);
        }
        let mut stmt = tx.prepare(&format!("SELECT {TODO_COLUMNS} FROM todos"))?;
        let rows = stmt
            .query_map([], todo_row)?
            .collect::<rusqlite::Result<Vec<TodoRow>>>()?;
        drop(stmt);

        let mut todos = Vec::new();
        for row in rows {
            let todo = decode_todo(row)?;
            if todo.tags.contains(&tag_id) {
                todos.push(todo);
            }
        }
        Ok(todos)
    }
}
