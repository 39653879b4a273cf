//! Identifier allocation.
//!
//! New id = maximum existing id + 1, with a baseline of 0 when the collection
//! is empty, so the first id is always 1. The maximum is recomputed from
//! current contents on every allocation. Consequences, all intentional:
//!
//! - deleting a non-max id never causes reuse (delete 2 while 3 exists → next is 4);
//! - deleting the current max makes its id eligible for reuse;
//! - after a bulk clear the next id is 1 again.
//!
//! This is a simplicity trade-off, not a monotonic global counter.

/// Computes the next id for a collection from its current ids.
///
/// Accepts anything iterable over ids, including an `Option<u64>` holding the
/// current maximum (as the SQLite backing passes).
pub fn next_id<I>(ids: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    ids.into_iter().max().unwrap_or(0) + 1
}
