//! Per-thread transcript storage.

pub mod file;
pub mod in_memory;

pub use file::FileThreadStore;
pub use in_memory::InMemoryThreadStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreConfig, StoreKind};
use crate::error::{EngineError, Result};
use crate::types::Transcript;

/// Checkpoint table keyed by thread id.
///
/// The store never interprets message contents. `save` is a full overwrite;
/// an implementation must leave the previous checkpoint intact if a save fails.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Stored transcript, or an empty one for an unseen thread.
    async fn load(&self, thread_id: &str) -> Result<Transcript>;

    async fn save(&self, thread_id: &str, transcript: &Transcript) -> Result<()>;

    /// Remove one thread. Clearing an unknown thread is not an error.
    async fn clear(&self, thread_id: &str) -> Result<()>;

    async fn clear_all(&self) -> Result<()>;
}

/// Open the store described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ThreadStore>> {
    match config.kind {
        StoreKind::Memory => Ok(Arc::new(InMemoryThreadStore::new())),
        StoreKind::File => {
            let directory = config.directory.clone().ok_or_else(|| {
                EngineError::Configuration(
                    "store.directory is required for the file store".to_string(),
                )
            })?;
            Ok(Arc::new(FileThreadStore::new(directory)))
        }
    }
}
