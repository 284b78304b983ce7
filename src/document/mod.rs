// Public API - what other modules can use
pub use errors::StoreError;
pub use memory::InMemoryDocumentStore;
pub use mongo::MongoDocumentStore;
pub use session_manager::{ConsistencyMode, MongoSessionManager, SessionCopy};
pub use store::{DocumentStore, UpsertOutcome};

use mongodb::bson::Document;
use serde::{de::DeserializeOwned, Serialize};

// Internal modules
mod errors;
mod matcher;
mod memory;
mod mongo;
mod session_manager;
mod store;

/// Converts a caller's struct into a schema-less document
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    Ok(mongodb::bson::to_document(value)?)
}

/// Decodes a stored document into a caller's struct
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(mongodb::bson::from_document(doc)?)
}
