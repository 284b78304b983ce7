use axum::Router;
use std::sync::Arc;

use app_start::{
    document::InMemoryDocumentStore,
    session::{
        repository::{DocumentSessionRepository, InMemorySessionRepository, SessionRepository},
        TokenConfig,
    },
    user::{CredentialVerifier, StaticCredentialVerifier},
    AppState,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_DATABASE: &str = "app_start_test";

pub struct TestSetup {
    pub app: Router,
    pub document_store: Arc<InMemoryDocumentStore>,
    /// Present when sessions are kept in memory rather than in the document store
    pub memory_sessions: Option<Arc<InMemorySessionRepository>>,
}

pub struct TestSetupBuilder {
    verifier: Arc<dyn CredentialVerifier>,
    sessions_in_document_store: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            verifier: Arc::new(StaticCredentialVerifier::default()),
            sessions_in_document_store: false,
        }
    }

    pub fn with_credentials(mut self, name: &str, password: &str) -> Self {
        self.verifier = Arc::new(StaticCredentialVerifier::new(name, password));
        self
    }

    /// Persist sessions through the document accessor, as production does
    pub fn with_document_sessions(mut self) -> Self {
        self.sessions_in_document_store = true;
        self
    }

    pub fn build(self) -> TestSetup {
        let document_store = Arc::new(InMemoryDocumentStore::new());

        let memory_sessions = (!self.sessions_in_document_store)
            .then(|| Arc::new(InMemorySessionRepository::new()));

        let session_repository: Arc<dyn SessionRepository + Send + Sync> = match &memory_sessions {
            Some(repo) => repo.clone(),
            None => Arc::new(DocumentSessionRepository::new(
                document_store.clone(),
                TEST_DATABASE,
            )),
        };

        let state = AppState::new(
            session_repository,
            self.verifier,
            TokenConfig::new("integration-secret", 7),
            "app_session",
        );

        TestSetup {
            app: app_start::app(state),
            document_store,
            memory_sessions,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
