// Library crate for the app-start web service
// This file exposes the public API for the binary and integration tests

pub mod api;
pub mod config;
pub mod document;
pub mod routes;
pub mod session;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use api::{Bind, Envelope};
pub use config::{AppConfig, SessionBackend};
pub use document::{
    DocumentStore, InMemoryDocumentStore, MongoDocumentStore, MongoSessionManager, StoreError,
};
pub use routes::app;
pub use shared::{AppError, AppState};
