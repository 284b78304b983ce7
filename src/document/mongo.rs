use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document};
use tracing::{debug, instrument};

use super::{
    errors::StoreError,
    session_manager::MongoSessionManager,
    store::{is_operator_update, page_offset, DocumentStore, UpsertOutcome},
};

/// `DocumentStore` backed by a live MongoDB deployment.
///
/// Each operation acquires its own session copy from the manager, resolves
/// the collection, issues one driver call and lets the copy drop on return.
#[derive(Clone)]
pub struct MongoDocumentStore {
    sessions: MongoSessionManager,
}

impl MongoDocumentStore {
    pub fn new(sessions: MongoSessionManager) -> Self {
        Self { sessions }
    }

    async fn find_with(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        projection: Document,
        skip: Option<u64>,
        limit: Option<u64>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let mut find = coll.find(query);
        if !projection.is_empty() {
            find = find.projection(projection);
        }
        if let Some(skip) = skip {
            find = find.skip(skip);
        }
        if let Some(limit) = limit.filter(|l| *l > 0) {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let mut cursor = find.session(copy.session_mut()).await?;
        let documents: Vec<Document> = cursor.stream(copy.session_mut()).try_collect().await?;
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    #[instrument(skip(self, doc))]
    async fn insert(&self, db: &str, collection: &str, doc: Document) -> Result<Bson, StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let result = coll.insert_one(doc).session(copy.session_mut()).await?;
        debug!(inserted_id = %result.inserted_id, "Inserted document");
        Ok(result.inserted_id)
    }

    #[instrument(skip(self, query))]
    async fn find_one(
        &self,
        db: &str,
        collection: &str,
        query: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        Ok(coll.find_one(query).session(copy.session_mut()).await?)
    }

    #[instrument(skip(self, query, projection))]
    async fn find_all(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        projection: Document,
    ) -> Result<Vec<Document>, StoreError> {
        self.find_with(db, collection, query, projection, None, None)
            .await
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
        let skip = page_offset(page, limit);
        debug!(skip, limit, "Fetching page");
        self.find_with(db, collection, query, projection, Some(skip), Some(limit))
            .await
    }

    #[instrument(skip(self, selector, update))]
    async fn update(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<(), StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let result = if is_operator_update(&update) {
            coll.update_one(selector, update)
                .session(copy.session_mut())
                .await?
        } else {
            coll.replace_one(selector, update)
                .session(copy.session_mut())
                .await?
        };

        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }
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
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let result = if is_operator_update(&update) {
            coll.update_one(selector, update)
                .upsert(true)
                .session(copy.session_mut())
                .await?
        } else {
            coll.replace_one(selector, update)
                .upsert(true)
                .session(copy.session_mut())
                .await?
        };

        Ok(UpsertOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
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
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let result = coll
            .update_many(selector, update)
            .session(copy.session_mut())
            .await?;
        Ok(result.matched_count)
    }

    #[instrument(skip(self, selector))]
    async fn remove(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
    ) -> Result<(), StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let result = coll.delete_one(selector).session(copy.session_mut()).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, selector))]
    async fn remove_all(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
    ) -> Result<u64, StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let result = coll.delete_many(selector).session(copy.session_mut()).await?;
        Ok(result.deleted_count)
    }

    #[instrument(skip(self, query))]
    async fn count(&self, db: &str, collection: &str, query: Document) -> Result<u64, StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        Ok(coll.count_documents(query).session(copy.session_mut()).await?)
    }

    #[instrument(skip(self))]
    async fn is_exist(&self, db: &str, collection: &str) -> Result<bool, StoreError> {
        let mut copy = self.sessions.acquire().await?;
        let coll = copy.collection(db, collection);

        let count = coll
            .count_documents(Document::new())
            .limit(1)
            .session(copy.session_mut())
            .await?;
        Ok(count > 0)
    }
}
