use mongodb::{
    bson::{doc, Document},
    options::ClientOptions,
    Client, ClientSession, Collection,
};
use tracing::{debug, info, instrument, trace};

use super::errors::StoreError;

/// Read consistency applied to every session copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsistencyMode {
    /// Causally consistent sessions: a copy always observes its own prior writes
    #[default]
    Monotonic,
    /// Plain sessions with no causal guarantees
    Eventual,
}

impl ConsistencyMode {
    fn causal_consistency(self) -> bool {
        matches!(self, ConsistencyMode::Monotonic)
    }
}

/// Owns the single process-wide MongoDB client and hands out session copies.
///
/// The client itself is never mutated after `initialize`; every operation
/// works on its own `SessionCopy`.
#[derive(Clone)]
pub struct MongoSessionManager {
    client: Client,
    mode: ConsistencyMode,
}

impl MongoSessionManager {
    /// Connects to `url` and verifies the server answers a ping.
    ///
    /// The driver connects lazily, so the ping is what makes an unreachable
    /// server fail here instead of on the first request.
    #[instrument(skip(url))]
    pub async fn initialize(url: &str, mode: ConsistencyMode) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(url).await?;
        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!(?mode, "MongoDB connection established");
        Ok(Self { client, mode })
    }

    /// Starts an independent session with the manager's consistency mode
    pub async fn acquire(&self) -> Result<SessionCopy, StoreError> {
        let session = self
            .client
            .start_session()
            .causal_consistency(self.mode.causal_consistency())
            .await?;

        trace!("Session copy acquired");
        Ok(SessionCopy { session })
    }
}

/// A scoped session borrowed from `MongoSessionManager`.
///
/// Dropping the copy ends the server session and returns it to the driver's
/// pool, so release happens on every exit path including unwinding.
pub struct SessionCopy {
    session: ClientSession,
}

impl SessionCopy {
    /// Resolves `db.name` against this copy's client
    pub fn collection(&self, db: &str, name: &str) -> Collection<Document> {
        debug!(db = %db, collection = %name, "Resolving collection");
        self.session.client().database(db).collection::<Document>(name)
    }

    pub fn session_mut(&mut self) -> &mut ClientSession {
        &mut self.session
    }

    /// Releases the copy now instead of at the end of the enclosing scope
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for SessionCopy {
    fn drop(&mut self) {
        trace!("Session copy released");
    }
}
