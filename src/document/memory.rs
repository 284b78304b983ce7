use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use super::{
    errors::StoreError,
    matcher::{apply_update, matches, project, seed_from_selector},
    store::{page_offset, DocumentStore, UpsertOutcome},
};

type CollectionKey = (String, String);

/// In-memory implementation of DocumentStore for development and testing
///
/// Collections keep insertion order, which stands in for natural order when
/// paging. Data is lost when the process exits.
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<CollectionKey, Vec<Document>>>,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of documents held in `db.collection`
    pub fn document_count(&self, db: &str, collection: &str) -> usize {
        self.lock()
            .get(&key(db, collection))
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CollectionKey, Vec<Document>>> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn matching(
        docs: &[Document],
        query: &Document,
    ) -> Result<Vec<usize>, StoreError> {
        let mut positions = Vec::new();
        for (index, doc) in docs.iter().enumerate() {
            if matches(doc, query)? {
                positions.push(index);
            }
        }
        Ok(positions)
    }

    fn first_match(docs: &[Document], query: &Document) -> Result<Option<usize>, StoreError> {
        for (index, doc) in docs.iter().enumerate() {
            if matches(doc, query)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

fn key(db: &str, collection: &str) -> CollectionKey {
    (db.to_string(), collection.to_string())
}

/// Updates are applied to a copy so a failing operator leaves the stored
/// document untouched.
fn updated(doc: &Document, update: &Document) -> Result<Document, StoreError> {
    let mut next = doc.clone();
    apply_update(&mut next, update)?;
    Ok(next)
}

fn ensure_id(doc: &mut Document) -> Bson {
    match doc.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            let mut with_id = Document::new();
            with_id.insert("_id", id.clone());
            with_id.extend(std::mem::take(doc));
            *doc = with_id;
            id
        }
    }
}

fn reject_duplicate_id(docs: &[Document], id: &Bson) -> Result<(), StoreError> {
    if docs.iter().any(|existing| existing.get("_id") == Some(id)) {
        warn!(id = %id, "Duplicate _id in memory");
        return Err(StoreError::DuplicateKey(id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self, doc))]
    async fn insert(
        &self,
        db: &str,
        collection: &str,
        mut doc: Document,
    ) -> Result<Bson, StoreError> {
        let id = ensure_id(&mut doc);

        let mut collections = self.lock();
        let docs = collections.entry(key(db, collection)).or_default();
        reject_duplicate_id(docs, &id)?;
        docs.push(doc);

        debug!(id = %id, "Document inserted in memory");
        Ok(id)
    }

    #[instrument(skip(self, query))]
    async fn find_one(
        &self,
        db: &str,
        collection: &str,
        query: Document,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.lock();
        let Some(docs) = collections.get(&key(db, collection)) else {
            return Ok(None);
        };
        Ok(Self::first_match(docs, &query)?.map(|index| docs[index].clone()))
    }

    #[instrument(skip(self, query, projection))]
    async fn find_all(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        projection: Document,
    ) -> Result<Vec<Document>, StoreError> {
        self.find_page(db, collection, 0, 0, query, projection).await
    }

    #[instrument(skip(self, query, projection))]
    async fn find_page(
        &self,
        db: &str,
        collection: &str,
        page: u64,
        limit: u64,
        query: Document,
        projection: Document,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.lock();
        let Some(docs) = collections.get(&key(db, collection)) else {
            return Ok(Vec::new());
        };

        let skip = usize::try_from(page_offset(page, limit)).unwrap_or(usize::MAX);
        let take = match limit {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        };

        let page = Self::matching(docs, &query)?
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|index| project(&docs[index], &projection))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page)
    }

    #[instrument(skip(self, selector, update))]
    async fn update(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.lock();
        let docs = collections
            .get_mut(&key(db, collection))
            .ok_or(StoreError::NotFound)?;
        let index = Self::first_match(docs, &selector)?.ok_or(StoreError::NotFound)?;

        docs[index] = updated(&docs[index], &update)?;
        Ok(())
    }

    #[instrument(skip(self, selector, update))]
    async fn upsert(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut collections = self.lock();
        let docs = collections.entry(key(db, collection)).or_default();

        if let Some(index) = Self::first_match(docs, &selector)? {
            let next = updated(&docs[index], &update)?;
            let modified = u64::from(next != docs[index]);
            docs[index] = next;
            return Ok(UpsertOutcome {
                matched_count: 1,
                modified_count: modified,
                upserted_id: None,
            });
        }

        let mut created = seed_from_selector(&selector)?;
        apply_update(&mut created, &update)?;
        let id = ensure_id(&mut created);
        reject_duplicate_id(docs, &id)?;
        docs.push(created);

        debug!(id = %id, "Upsert inserted a new document in memory");
        Ok(UpsertOutcome {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    #[instrument(skip(self, selector, update))]
    async fn update_all(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<u64, StoreError> {
        let mut collections = self.lock();
        let Some(docs) = collections.get_mut(&key(db, collection)) else {
            return Ok(0);
        };

        let positions = Self::matching(docs, &selector)?;
        for index in &positions {
            docs[*index] = updated(&docs[*index], &update)?;
        }
        Ok(positions.len() as u64)
    }

    #[instrument(skip(self, selector))]
    async fn remove(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.lock();
        let docs = collections
            .get_mut(&key(db, collection))
            .ok_or(StoreError::NotFound)?;
        let index = Self::first_match(docs, &selector)?.ok_or(StoreError::NotFound)?;

        docs.remove(index);
        Ok(())
    }

    #[instrument(skip(self, selector))]
    async fn remove_all(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
    ) -> Result<u64, StoreError> {
        let mut collections = self.lock();
        let Some(docs) = collections.get_mut(&key(db, collection)) else {
            return Ok(0);
        };

        let positions = Self::matching(docs, &selector)?;
        let mut index = 0;
        docs.retain(|_| {
            let keep = positions.binary_search(&index).is_err();
            index += 1;
            keep
        });
        Ok(positions.len() as u64)
    }

    #[instrument(skip(self, query))]
    async fn count(&self, db: &str, collection: &str, query: Document) -> Result<u64, StoreError> {
        let collections = self.lock();
        let Some(docs) = collections.get(&key(db, collection)) else {
            return Ok(0);
        };
        Ok(Self::matching(docs, &query)?.len() as u64)
    }

    #[instrument(skip(self))]
    async fn is_exist(&self, db: &str, collection: &str) -> Result<bool, StoreError> {
        Ok(self.document_count(db, collection) > 0)
    }
}
