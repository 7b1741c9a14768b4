//! In-process document store.
//!
//! DESIGN
//! ======
//! Documents live in a `BTreeMap` keyed by full path behind a tokio
//! `RwLock`. A transaction owns the write guard for its whole lifetime, so
//! transactions are fully serialized and `lock` needs no extra bookkeeping.
//! Writes are staged in an overlay and applied to the map only on commit.
//!
//! Fault injection (`fail_next_commit`) lets tests abort a commit after all
//! writes were staged and verify that nothing became visible.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{CollectionPath, Data, DocPath, Document, DocumentStore, Query, StoreError, Transaction};

type DocMap = BTreeMap<DocPath, Data>;

#[derive(Debug, Default)]
struct Faults {
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<DocMap>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail with `Aborted` after its writes were staged.
    #[cfg(test)]
    pub fn fail_next_commit(&self) {
        self.faults.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successfully applied commits.
    #[cfg(test)]
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.faults.commits.load(Ordering::SeqCst)
    }

    /// Copy of every stored document, keyed by path.
    #[cfg(test)]
    pub async fn snapshot(&self) -> BTreeMap<String, Data> {
        self.docs
            .read()
            .await
            .iter()
            .map(|(path, data)| (path.as_str().to_owned(), data.clone()))
            .collect()
    }
}

/// Documents directly inside `collection` (not in nested sub-collections).
fn in_collection(path: &DocPath, collection: &CollectionPath) -> bool {
    path.parent_collection() == *collection
}

fn run_query<'a>(
    entries: impl Iterator<Item = (&'a DocPath, &'a Data)>,
    collection: &CollectionPath,
    query: &Query,
) -> Vec<Document> {
    let mut docs = entries
        .filter(|(path, data)| in_collection(path, collection) && query.matches(data))
        .map(|(path, data)| Document { path: path.clone(), data: data.clone() })
        .collect::<Vec<_>>();
    query.finish(&mut docs);
    docs
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(path)
            .map(|data| Document { path: path.clone(), data: data.clone() }))
    }

    async fn query(&self, collection: &CollectionPath, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(run_query(docs.iter(), collection, query))
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = Arc::clone(&self.docs).write_owned().await;
        Ok(Box::new(MemoryTransaction { guard, staged: BTreeMap::new(), faults: Arc::clone(&self.faults) }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// =============================================================================
// TRANSACTION
// =============================================================================

struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<DocMap>,
    /// Pending writes: `Some` = set, `None` = delete.
    staged: BTreeMap<DocPath, Option<Data>>,
    faults: Arc<Faults>,
}

impl MemoryTransaction {
    fn read(&self, path: &DocPath) -> Option<Data> {
        match self.staged.get(path) {
            Some(staged) => staged.clone(),
            None => self.guard.get(path).cloned(),
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn lock(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        // The write guard already excludes every other transaction.
        self.get(path).await
    }

    async fn get(&mut self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self
            .read(path)
            .map(|data| Document { path: path.clone(), data }))
    }

    async fn query(&mut self, collection: &CollectionPath, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut merged: DocMap = (*self.guard).clone();
        for (path, staged) in &self.staged {
            match staged {
                Some(data) => {
                    merged.insert(path.clone(), data.clone());
                }
                None => {
                    merged.remove(path);
                }
            }
        }
        Ok(run_query(merged.iter(), collection, query))
    }

    async fn create(&mut self, path: &DocPath, data: Data) -> Result<(), StoreError> {
        if self.read(path).is_some() {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        self.staged.insert(path.clone(), Some(data));
        Ok(())
    }

    async fn set(&mut self, path: &DocPath, data: Data) -> Result<(), StoreError> {
        self.staged.insert(path.clone(), Some(data));
        Ok(())
    }

    async fn delete(&mut self, path: &DocPath) -> Result<(), StoreError> {
        self.staged.insert(path.clone(), None);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        if self.faults.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Aborted("injected commit failure".into()));
        }
        let staged = std::mem::take(&mut self.staged);
        for (path, write) in staged {
            match write {
                Some(data) => {
                    self.guard.insert(path, data);
                }
                None => {
                    self.guard.remove(&path);
                }
            }
        }
        self.faults.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
