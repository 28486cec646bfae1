use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::OnceCell;
use tracing::info;

use crate::{
    config::SleepConfig,
    persist::{NightStore, PersistError, PersistResult, sqlite::SqliteNightStore},
};

use super::handle::{RuntimeError, SleepDatabaseDao, spawn_dao};

/// Opens the backing store. Runs on the blocking pool.
pub type StoreFactory = Arc<dyn Fn() -> PersistResult<Box<dyn NightStore>> + Send + Sync>;

/// Lazily opened, process-shared database handle.
///
/// Owned by the application's composition root and handed to controllers by
/// reference. The backing store is opened at most once, on the first
/// [`SleepDatabase::instance`] call; concurrent first callers all wait for
/// that single open and receive the same [`SleepDatabaseDao`].
pub struct SleepDatabase {
    config: SleepConfig,
    factory: StoreFactory,
    cell: OnceCell<SleepDatabaseDao>,
    opens: AtomicUsize,
}

impl SleepDatabase {
    /// Database backed by SQLite at `config.database_path`, or an in-memory
    /// SQLite database when no path is configured.
    pub fn new(config: SleepConfig) -> Self {
        let path = config.database_path.clone();
        let factory: StoreFactory = Arc::new(move || -> PersistResult<Box<dyn NightStore>> {
            let store = match &path {
                Some(path) => SqliteNightStore::open(path)?,
                None => SqliteNightStore::open_in_memory()?,
            };
            Ok(Box::new(store) as Box<dyn NightStore>)
        });
        Self::with_store(config, factory)
    }

    /// Database whose store is produced by `factory`.
    pub fn with_store(config: SleepConfig, factory: StoreFactory) -> Self {
        Self {
            config,
            factory,
            cell: OnceCell::new(),
            opens: AtomicUsize::new(0),
        }
    }

    /// Returns the shared handle, opening the store on first use.
    ///
    /// A failed open leaves the cell empty so a later call retries.
    pub async fn instance(&self) -> Result<SleepDatabaseDao, RuntimeError> {
        let dao = self.cell.get_or_try_init(|| self.open()).await?;
        Ok(dao.clone())
    }

    /// Handle if the store has already been opened.
    pub fn get(&self) -> Option<&SleepDatabaseDao> {
        self.cell.get()
    }

    /// How many times the store factory has run.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SleepConfig {
        &self.config
    }

    async fn open(&self) -> Result<SleepDatabaseDao, RuntimeError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        info!(path = ?self.config.database_path, "opening sleep database");

        let factory = Arc::clone(&self.factory);
        let store = tokio::task::spawn_blocking(move || factory())
            .await
            .map_err(|e| PersistError::Join(e.to_string()))??;
        spawn_dao(store, &self.config).await
    }
}
