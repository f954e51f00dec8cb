use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value as JsonValue;

use super::query::Query;
use super::r#trait::{DocumentStore, RawDocument, StoreError, Transaction};

#[derive(Debug, Default)]
struct Collection {
    /// Bumped by every commit that writes into the collection.
    version: u64,
    docs: BTreeMap<String, JsonValue>,
}

type Collections = HashMap<String, Collection>;

/// In-memory document store with serializable transactions.
///
/// Intended for tests/dev. Isolation is optimistic and collection-grained: a
/// transaction remembers the version of every collection it reads, and fails with
/// [`StoreError::Conflict`] (on a later read, or at commit) once any of them moved.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn version_of(collections: &Collections, name: &str) -> u64 {
        collections.get(name).map(|c| c.version).unwrap_or(0)
    }
}

fn raw(collection: &str, key: &str, body: &JsonValue) -> RawDocument {
    RawDocument {
        collection: collection.to_string(),
        key: key.to_string(),
        body: body.clone(),
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<RawDocument>, StoreError> {
        let collections = self.read_state()?;
        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.get(key))
            .map(|body| raw(collection, key, body)))
    }

    fn query(&self, query: &Query) -> Result<Vec<RawDocument>, StoreError> {
        let collections = self.read_state()?;
        let name = query.collection();
        let candidates: Vec<RawDocument> = collections
            .get(name)
            .map(|c| c.docs.iter().map(|(key, body)| raw(name, key, body)).collect())
            .unwrap_or_default();
        Ok(query.apply(candidates))
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            store: self,
            observed: HashMap::new(),
            writes: BTreeMap::new(),
        }))
    }
}

struct InMemoryTransaction<'a> {
    store: &'a InMemoryDocumentStore,
    /// Collection name -> version seen on first read.
    observed: HashMap<String, u64>,
    /// `None` stages a delete.
    writes: BTreeMap<(String, String), Option<JsonValue>>,
}

impl InMemoryTransaction<'_> {
    fn observe(&mut self, collections: &Collections, name: &str) -> Result<(), StoreError> {
        let current = InMemoryDocumentStore::version_of(collections, name);
        match self.observed.get(name) {
            Some(&seen) if seen != current => Err(StoreError::Conflict(format!(
                "collection '{name}' moved from version {seen} to {current}"
            ))),
            Some(_) => Ok(()),
            None => {
                self.observed.insert(name.to_string(), current);
                Ok(())
            }
        }
    }
}

impl Transaction for InMemoryTransaction<'_> {
    fn get(&mut self, collection: &str, key: &str) -> Result<Option<RawDocument>, StoreError> {
        let store = self.store;
        let collections = store.read_state()?;
        self.observe(&collections, collection)?;

        if let Some(staged) = self.writes.get(&(collection.to_string(), key.to_string())) {
            return Ok(staged.as_ref().map(|body| raw(collection, key, body)));
        }

        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.get(key))
            .map(|body| raw(collection, key, body)))
    }

    fn query(&mut self, query: &Query) -> Result<Vec<RawDocument>, StoreError> {
        let store = self.store;
        let collections = store.read_state()?;
        let name = query.collection();
        self.observe(&collections, name)?;

        let staged: Vec<(&String, &Option<JsonValue>)> = self
            .writes
            .iter()
            .filter(|((c, _), _)| c == name)
            .map(|((_, k), body)| (k, body))
            .collect();

        let mut candidates: Vec<RawDocument> = collections
            .get(name)
            .map(|c| {
                c.docs
                    .iter()
                    .filter(|(key, _)| !staged.iter().any(|(k, _)| k == key))
                    .map(|(key, body)| raw(name, key, body))
                    .collect()
            })
            .unwrap_or_default();

        candidates.extend(
            staged
                .iter()
                .filter_map(|(key, body)| body.as_ref().map(|b| raw(name, key, b))),
        );

        Ok(query.apply(candidates))
    }

    fn put(&mut self, collection: &str, key: &str, body: JsonValue) -> Result<(), StoreError> {
        self.writes
            .insert((collection.to_string(), key.to_string()), Some(body));
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.writes
            .insert((collection.to_string(), key.to_string()), None);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;

        // Every read already saw one consistent state; nothing to publish.
        if this.writes.is_empty() {
            return Ok(());
        }

        let mut collections = this.store.write_state()?;

        for (name, seen) in &this.observed {
            let current = InMemoryDocumentStore::version_of(&collections, name);
            if current != *seen {
                return Err(StoreError::Conflict(format!(
                    "collection '{name}' moved from version {seen} to {current} before commit"
                )));
            }
        }

        let mut touched = BTreeSet::new();
        for ((name, key), staged) in this.writes {
            let collection = collections.entry(name.clone()).or_default();
            match staged {
                Some(body) => {
                    collection.docs.insert(key, body);
                }
                None => {
                    collection.docs.remove(&key);
                }
            }
            touched.insert(name);
        }

        for name in touched {
            if let Some(collection) = collections.get_mut(&name) {
                collection.version += 1;
            }
        }

        Ok(())
    }
}
