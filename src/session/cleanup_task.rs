use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

use super::repository::SessionRepository;
use crate::shared::AppError;

/// Configuration for the cleanup task
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often expired sessions are swept
    pub cleanup_interval: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(30 * 60), // 30 minutes
        }
    }
}

/// Starts the background task that periodically removes expired sessions.
///
/// Runs until the surrounding runtime shuts down; a failed sweep is logged
/// and retried on the next tick.
#[instrument(skip(session_repository))]
pub async fn start_cleanup_task(
    session_repository: Arc<dyn SessionRepository + Send + Sync>,
    config: CleanupConfig,
) {
    info!(
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        "Starting session cleanup background task"
    );

    let mut cleanup_interval = interval(config.cleanup_interval);

    loop {
        cleanup_interval.tick().await;

        match sweep_expired_sessions(&session_repository).await {
            Ok(removed) => {
                info!(removed, "Session cleanup completed");
            }
            Err(e) => {
                error!(error = %e, "Session cleanup task failed");
            }
        }
    }
}

async fn sweep_expired_sessions(
    session_repository: &Arc<dyn SessionRepository + Send + Sync>,
) -> Result<u64, AppError> {
    session_repository.cleanup_expired_sessions().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{models::SessionModel, repository::InMemorySessionRepository};
    use chrono::Utc;

    fn expired_session() -> SessionModel {
        let mut session = SessionModel::new(7);
        session.expires_at = Utc::now() - chrono::Duration::hours(1);
        session
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_sessions() {
        let live = SessionModel::new(7);
        let concrete_repo = Arc::new(InMemorySessionRepository::with_sessions(vec![
            live.clone(),
            expired_session(),
        ]));
        let repo: Arc<dyn SessionRepository + Send + Sync> = concrete_repo.clone();

        let removed = sweep_expired_sessions(&repo).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(concrete_repo.session_count(), 1);
        assert!(concrete_repo.has_session(&live.id));
    }

    #[tokio::test]
    async fn test_task_sweeps_on_first_tick() {
        let concrete_repo = Arc::new(InMemorySessionRepository::with_sessions(vec![
            expired_session(),
            expired_session(),
        ]));
        let repo: Arc<dyn SessionRepository + Send + Sync> = concrete_repo.clone();

        let handle = tokio::spawn(start_cleanup_task(
            repo,
            CleanupConfig {
                cleanup_interval: Duration::from_millis(10),
            },
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(concrete_repo.session_count(), 0);
    }
}
