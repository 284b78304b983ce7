use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use super::errors::StoreError;

/// Outcome of an upsert
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    /// Set only when the upsert inserted a new document
    pub upserted_id: Option<Bson>,
}

/// Generic access to schema-less collections.
///
/// Every call addresses a `(db, collection)` pair and performs a single round
/// trip. Payloads are passed through as-is; implementations never reshape
/// the caller's query, update or document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `doc`, returning its `_id` (generated when absent)
    async fn insert(&self, db: &str, collection: &str, doc: Document) -> Result<Bson, StoreError>;

    async fn find_one(
        &self,
        db: &str,
        collection: &str,
        query: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn find_all(
        &self,
        db: &str,
        collection: &str,
        query: Document,
        projection: Document,
    ) -> Result<Vec<Document>, StoreError>;

    /// Zero-indexed pagination: skips `page * limit` matches, then returns at
    /// most `limit`. A limit of 0 means no limit.
    async fn find_page(
        &self,
        db: &str,
        collection: &str,
        page: u64,
        limit: u64,
        query: Document,
        projection: Document,
    ) -> Result<Vec<Document>, StoreError>;

    /// Updates the first match. Fails with `NotFound` when nothing matched.
    async fn update(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<(), StoreError>;

    async fn upsert(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Updates every match and returns how many matched
    async fn update_all(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
        update: Document,
    ) -> Result<u64, StoreError>;

    /// Removes the first match. Fails with `NotFound` when nothing matched.
    async fn remove(&self, db: &str, collection: &str, selector: Document)
        -> Result<(), StoreError>;

    /// Removes every match and returns how many were deleted
    async fn remove_all(
        &self,
        db: &str,
        collection: &str,
        selector: Document,
    ) -> Result<u64, StoreError>;

    async fn count(&self, db: &str, collection: &str, query: Document) -> Result<u64, StoreError>;

    /// True iff the collection holds at least one document
    async fn is_exist(&self, db: &str, collection: &str) -> Result<bool, StoreError>;
}

/// An update document whose first key is an operator (`$set`, `$inc`, ...).
/// Anything else replaces the matched document wholesale.
pub fn is_operator_update(update: &Document) -> bool {
    update
        .keys()
        .next()
        .map(|key| key.starts_with('$'))
        .unwrap_or(false)
}

/// Skip offset for a zero-indexed page
pub fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_mul(limit)
}
