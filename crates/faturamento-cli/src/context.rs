//! Per-invocation wiring: config, identity, record store and controller.

use crate::identity::require_principal;
use crate::output::OutputMode;
use anyhow::Context as _;
use faturamento_core::access::{AccessPolicy, Session};
use faturamento_core::app::Controller;
use faturamento_core::config::{AppConfig, StoreBackend, load_config};
use faturamento_core::error::CoreError;
use faturamento_core::model::Principal;
use faturamento_core::registry::AssignmentRegistry;
use faturamento_core::store::RecordStore;
use faturamento_core::store::http::HttpStore;
use faturamento_core::store::sqlite::SqliteStore;
use faturamento_core::sync::OptimisticSyncClient;
use faturamento_core::workflow::StatusWorkflow;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub type CliController = Controller<Arc<dyn RecordStore>>;

pub struct CliContext {
    pub config: AppConfig,
    pub output: OutputMode,
    email: Option<String>,
    name: Option<String>,
}

impl CliContext {
    /// # Errors
    ///
    /// Returns an error for an unreadable or invalid config file.
    pub fn load(
        config_path: Option<&Path>,
        json: bool,
        email: Option<String>,
        name: Option<String>,
    ) -> anyhow::Result<Self> {
        let config = load_config(config_path)?;
        let output = OutputMode::resolve(json, config.output.as_deref());
        Ok(Self {
            config,
            output,
            email,
            name,
        })
    }

    /// # Errors
    ///
    /// Returns an identity error when no e-mail is available.
    pub fn principal(&self) -> anyhow::Result<Principal> {
        Ok(require_principal(
            self.email.as_deref(),
            self.name.as_deref(),
        )?)
    }

    /// Sign in through the configured access policy.
    ///
    /// # Errors
    ///
    /// Identity errors, or [`CoreError::AccessDenied`].
    pub fn session(&self) -> anyhow::Result<Session> {
        let principal = self.principal()?;
        let policy = AccessPolicy::from_config(&self.config.access);
        Ok(policy.authenticate(principal)?)
    }

    /// # Errors
    ///
    /// Returns an error when the SQLite file cannot be opened or the HTTP
    /// backend has no base URL.
    pub fn open_store(&self) -> anyhow::Result<Arc<dyn RecordStore>> {
        match self.config.store.backend {
            StoreBackend::Sqlite => Ok(Arc::new(self.open_sqlite()?)),
            StoreBackend::Http => {
                let base_url = self.config.api_base_url()?;
                debug!(base_url, "using record service");
                Ok(Arc::new(HttpStore::new(base_url, self.config.timeout())))
            }
        }
    }

    /// The local database, whatever backend is configured for reads.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened or migrated.
    pub fn open_sqlite(&self) -> anyhow::Result<SqliteStore> {
        let path = self.config.sqlite_path();
        debug!(path = %path.display(), "using local store");
        let store = SqliteStore::open(&path)
            .with_context(|| format!("Failed to open local store {}", path.display()))?;
        Ok(store.with_date_basis(self.config.dashboard.date_basis))
    }

    /// Signed-in controller over the configured store.
    ///
    /// # Errors
    ///
    /// Identity, access, store and configuration errors.
    pub fn controller(&self) -> anyhow::Result<CliController> {
        let session = self.session()?;
        let store = self.open_store()?;
        let registry = Arc::new(AssignmentRegistry::new(
            self.config.collaborators.roster.iter().cloned(),
        ));
        let sync = OptimisticSyncClient::new(store, StatusWorkflow::default(), registry);
        let today = chrono::Local::now().date_naive();
        Ok(Controller::new(session, sync, &self.config, today)?)
    }

    /// Refuse commands that only make sense against the local database.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] when the HTTP backend is active.
    pub fn require_local(&self, command: &str) -> anyhow::Result<()> {
        if self.config.store.backend == StoreBackend::Http {
            return Err(CoreError::InvalidConfiguration(format!(
                "`fat {command}` writes the local SQLite store; set store.backend = \"sqlite\""
            ))
            .into());
        }
        Ok(())
    }
}
