//! Shared handler state.

use std::sync::Arc;

use cubicle_executor::{CodeRunner, ExecBackend, ProcessBackend, SnapshotStore};
use cubicle_store::{CredentialStore, Database, PostRepository, SqlCredentialStore};
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Runner over whichever backend the server was built with.
pub type SharedRunner = CodeRunner<Arc<dyn ExecBackend>>;

/// Everything the handlers need. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostRepository,
    pub credentials: Arc<dyn CredentialStore>,
    pub runner: Arc<SharedRunner>,
    pub snapshots: Arc<SnapshotStore>,
}

impl AppState {
    /// Assemble state from already-opened parts.
    #[must_use]
    pub fn new(db: Database, runner: SharedRunner, snapshots: SnapshotStore) -> Self {
        Self {
            posts: PostRepository::new(db.clone()),
            credentials: Arc::new(SqlCredentialStore::new(db)),
            runner: Arc::new(runner),
            snapshots: Arc::new(snapshots),
        }
    }

    /// Open the database, seed the configured account, and set up the
    /// process-backed runner.
    ///
    /// An unusable interpreter is logged but does not stop startup; each
    /// execution reports it again.
    ///
    /// # Errors
    /// Returns [`GatewayError::Store`] if the database cannot be opened or
    /// the account cannot be seeded.
    pub async fn initialize(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let db = Database::open(&config.database_url).await?;

        match &config.admin {
            Some(admin) => {
                let user = SqlCredentialStore::new(db.clone())
                    .ensure_user(&admin.username, &admin.password)
                    .await?;
                info!(user_id = %user.id, username = %user.username, "seeded account ready");
            }
            None => warn!("no seeded account configured; log in after registering at /register"),
        }

        let backend: Arc<dyn ExecBackend> = Arc::new(ProcessBackend::new());
        let runner = CodeRunner::new(backend, config.sandbox.clone());
        if let Err(e) = runner.health_check().await {
            warn!(error = %e, "code execution is not available");
        }

        let snapshots = SnapshotStore::new(&config.snapshot_dir, config.max_snapshot_bytes);
        Ok(Self::new(db, runner, snapshots))
    }
}
