use app_start::{
    document::{ConsistencyMode, DocumentStore, MongoDocumentStore, MongoSessionManager},
    session::{
        repository::{DocumentSessionRepository, InMemorySessionRepository, SessionRepository},
        start_cleanup_task, CleanupConfig, TokenConfig,
    },
    user::StaticCredentialVerifier,
    AppConfig, AppState, SessionBackend,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_start=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!(mongo_url = %config.mongo_url, database = %config.mongo_database, "Starting app-start server");

    // Without a database connection the process cannot serve anything
    let sessions =
        match MongoSessionManager::initialize(&config.mongo_url, ConsistencyMode::Monotonic).await
        {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(error = %e, mongo_url = %config.mongo_url, "MongoDB connection error");
                std::process::exit(1);
            }
        };
    info!(mongo_url = %config.mongo_url, "MongoDB connection open");

    let document_store: Arc<dyn DocumentStore> = Arc::new(MongoDocumentStore::new(sessions));

    let session_repository: Arc<dyn SessionRepository + Send + Sync> =
        match config.session_backend {
            SessionBackend::Mongo => Arc::new(DocumentSessionRepository::new(
                Arc::clone(&document_store),
                config.mongo_database.clone(),
            )),
            SessionBackend::Memory => Arc::new(InMemorySessionRepository::new()),
        };

    tokio::spawn(start_cleanup_task(
        Arc::clone(&session_repository),
        CleanupConfig::default(),
    ));

    let app_state = AppState::new(
        session_repository,
        Arc::new(StaticCredentialVerifier::default()),
        TokenConfig::new(config.jwt_secret.clone(), config.session_expiration_days),
        config.session_cookie_name.clone(),
    );

    let app = app_start::app(app_state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind_addr = %config.bind_addr, "Failed to bind listener");
            std::process::exit(1);
        }
    };
    info!("Server running on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
