//! Pack-size stores: where the active size set survives restarts.
//!
//! Stores are blocking and `Send + Sync`; async callers go through
//! `spawn_blocking`. The in-memory [`PackSizeConfig`](crate::pack::PackSizeConfig)
//! is the source of truth while the process runs and writes through to the
//! store on every replace.

mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

use std::sync::Arc;

use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::AppError;

pub use memory::MemoryStore;
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteStore;

/// Persistent home of the pack-size set.
pub trait PackSizeStore: Send + Sync {
    /// Backend name used in logs (e.g. `"sqlite"`).
    fn store_type(&self) -> &str;

    /// Stored sizes, largest first. Empty when nothing was ever saved.
    fn load(&self) -> Result<Vec<u64>, AppError>;

    /// Replace the stored set with `sizes` in one step.
    fn save(&self, sizes: &[u64]) -> Result<(), AppError>;
}

/// Open the backend selected in `[store]`.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn PackSizeStore>, AppError> {
    let store: Arc<dyn PackSizeStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        #[cfg(feature = "store-sqlite")]
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
        #[cfg(not(feature = "store-sqlite"))]
        StoreBackend::Sqlite => {
            return Err(AppError::Config(
                "store backend 'sqlite' is configured but not compiled in".into(),
            ));
        }
    };
    info!(store = store.store_type(), path = %config.path.display(), "pack-size store ready");
    Ok(store)
}
