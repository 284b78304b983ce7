use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::doc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use super::models::SessionModel;
use crate::document::{from_document, to_document, DocumentStore, StoreError};
use crate::shared::AppError;

/// Collection holding session records
pub const SESSION_COLLECTION: &str = "sessions";

/// Trait for session repository operations
#[async_trait]
pub trait SessionRepository {
    async fn create_session(&self, session: &SessionModel) -> Result<(), AppError>;
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>, AppError>;
    async fn update_session(&self, session: &SessionModel) -> Result<(), AppError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError>;
    async fn cleanup_expired_sessions(&self) -> Result<u64, AppError>;
}

/// In-memory implementation of SessionRepository for development and testing
///
/// Data is stored in memory and will be lost when the application restarts.
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, SessionModel>>,
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated sessions
    pub fn with_sessions(sessions: Vec<SessionModel>) -> Self {
        let session_map = sessions
            .into_iter()
            .map(|session| (session.id.clone(), session))
            .collect();

        Self {
            sessions: Mutex::new(session_map),
        }
    }

    /// Returns the current number of sessions in the repository
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Checks if a session exists by ID (useful for debugging)
    pub fn has_session(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionModel>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &SessionModel) -> Result<(), AppError> {
        debug!(session_id = %session.id, "Creating session in memory");

        let mut sessions = self.lock();
        if sessions.contains_key(&session.id) {
            warn!(session_id = %session.id, "Session already exists in memory");
            return Err(AppError::DatabaseError(
                "Session already exists".to_string(),
            ));
        }
        sessions.insert(session.id.clone(), session.clone());

        debug!(session_id = %session.id, "Session created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>, AppError> {
        debug!(session_id = %session_id, "Fetching session from memory");

        let session = self.lock().get(session_id).cloned();
        if session.is_none() {
            debug!(session_id = %session_id, "Session not found in memory");
        }

        Ok(session)
    }

    #[instrument(skip(self, session))]
    async fn update_session(&self, session: &SessionModel) -> Result<(), AppError> {
        debug!(session_id = %session.id, "Updating session in memory");

        let mut sessions = self.lock();
        if !sessions.contains_key(&session.id) {
            warn!(session_id = %session.id, "Session not found for update in memory");
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        sessions.insert(session.id.clone(), session.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        debug!(session_id = %session_id, "Deleting session from memory");

        if self.lock().remove(session_id).is_none() {
            warn!(session_id = %session_id, "Session not found for deletion in memory");
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let mut sessions = self.lock();
        let initial_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired());

        let removed = (initial_count - sessions.len()) as u64;
        debug!(expired_sessions_removed = removed, "Expired sessions cleaned up");
        Ok(removed)
    }
}

/// Session repository persisted through the document accessor
pub struct DocumentSessionRepository {
    store: Arc<dyn DocumentStore>,
    database: String,
}

impl DocumentSessionRepository {
    pub fn new(store: Arc<dyn DocumentStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
        }
    }
}

#[async_trait]
impl SessionRepository for DocumentSessionRepository {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &SessionModel) -> Result<(), AppError> {
        debug!(session_id = %session.id, "Creating session in document store");

        let doc = to_document(session)?;
        self.store
            .insert(&self.database, SESSION_COLLECTION, doc)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create session in document store");
                AppError::from(e)
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>, AppError> {
        let found = self
            .store
            .find_one(&self.database, SESSION_COLLECTION, doc! { "_id": session_id })
            .await?;

        Ok(found.map(from_document::<SessionModel>).transpose()?)
    }

    #[instrument(skip(self, session))]
    async fn update_session(&self, session: &SessionModel) -> Result<(), AppError> {
        debug!(session_id = %session.id, "Updating session in document store");

        let doc = to_document(session)?;
        self.store
            .update(
                &self.database,
                SESSION_COLLECTION,
                doc! { "_id": session.id.as_str() },
                doc,
            )
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::NotFound("Session not found".to_string()),
                other => AppError::from(other),
            })
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.store
            .remove(&self.database, SESSION_COLLECTION, doc! { "_id": session_id })
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::NotFound("Session not found".to_string()),
                other => AppError::from(other),
            })
    }

    #[instrument(skip(self))]
    async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let now = Utc::now().timestamp();
        let removed = self
            .store
            .remove_all(
                &self.database,
                SESSION_COLLECTION,
                doc! { "expires_at": { "$lt": now } },
            )
            .await?;

        debug!(expired_sessions_removed = removed, "Expired sessions cleaned up");
        Ok(removed)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::document::InMemoryDocumentStore;
    use chrono::Duration;
    use serde_json::json;

    /// Test helper functions for creating test data
    mod helpers {
        use super::*;

        pub fn create_expired_session() -> SessionModel {
            let mut session = SessionModel::new(7);
            session.expires_at = Utc::now() - Duration::hours(1);
            session
        }
    }

    use helpers::*;

    type DynRepository = Box<dyn SessionRepository + Send + Sync>;

    /// Every implementation must behave the same against the same calls
    fn repositories() -> Vec<DynRepository> {
        let in_memory: DynRepository = Box::new(InMemorySessionRepository::new());
        let document_backed: DynRepository = Box::new(DocumentSessionRepository::new(
            Arc::new(InMemoryDocumentStore::new()),
            "test",
        ));
        vec![in_memory, document_backed]
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        for repo in repositories() {
            let mut session = SessionModel::new(7);
            session.values.insert("user_name".to_string(), json!("admin"));

            repo.create_session(&session).await.unwrap();

            let retrieved = repo.get_session(&session.id).await.unwrap().unwrap();
            assert_eq!(retrieved.id, session.id);
            assert_eq!(retrieved.values.get("user_name"), Some(&json!("admin")));
        }
    }

    #[tokio::test]
    async fn test_get_nonexistent_session() {
        for repo in repositories() {
            let result = repo.get_session("nonexistent-id").await.unwrap();
            assert!(result.is_none());
        }
    }

    #[tokio::test]
    async fn test_create_duplicate_session() {
        for repo in repositories() {
            let session = SessionModel::new(7);
            repo.create_session(&session).await.unwrap();

            let result = repo.create_session(&session).await;
            assert!(matches!(result, Err(AppError::DatabaseError(_))));
        }
    }

    #[tokio::test]
    async fn test_update_session() {
        for repo in repositories() {
            let mut session = SessionModel::new(7);
            repo.create_session(&session).await.unwrap();

            session.values.insert("user_name".to_string(), json!("updated"));
            repo.update_session(&session).await.unwrap();

            let retrieved = repo.get_session(&session.id).await.unwrap().unwrap();
            assert_eq!(retrieved.values.get("user_name"), Some(&json!("updated")));
        }
    }

    #[tokio::test]
    async fn test_update_nonexistent_session() {
        for repo in repositories() {
            let session = SessionModel::new(7);
            let result = repo.update_session(&session).await;
            assert!(matches!(result, Err(AppError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_delete_session() {
        for repo in repositories() {
            let session = SessionModel::new(7);
            repo.create_session(&session).await.unwrap();

            repo.delete_session(&session.id).await.unwrap();
            assert!(repo.get_session(&session.id).await.unwrap().is_none());

            let again = repo.delete_session(&session.id).await;
            assert!(matches!(again, Err(AppError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        for repo in repositories() {
            let live = SessionModel::new(7);
            repo.create_session(&live).await.unwrap();
            repo.create_session(&create_expired_session()).await.unwrap();
            repo.create_session(&create_expired_session()).await.unwrap();

            let removed = repo.cleanup_expired_sessions().await.unwrap();
            assert_eq!(removed, 2);
            assert!(repo.get_session(&live.id).await.unwrap().is_some());
        }
    }

    #[test]
    fn test_with_sessions_prepopulates() {
        let sessions = vec![SessionModel::new(7), SessionModel::new(7)];
        let id = sessions[0].id.clone();
        let repo = InMemorySessionRepository::with_sessions(sessions);

        assert_eq!(repo.session_count(), 2);
        assert!(repo.has_session(&id));
    }
}
