//! `dg-datastore` — storage client crate for DreamGate.
//!
//! Provides the [`DataStore`] trait that abstracts over the relational +
//! vector store backing the pipeline, a production REST implementation
//! ([`RestDataStore`]) speaking the PostgREST dialect, an in-process
//! implementation ([`MemoryStore`]) for development and tests, and the row
//! DTOs shared between them.
//!
//! The four logical stores of the persistence fan-out map to four tables:
//!
//! | Logical store        | Table               | Write semantics            |
//! |----------------------|---------------------|----------------------------|
//! | raw archive          | `call_transcripts`  | insert, immutable          |
//! | vectorized store     | `vector_records`    | insert                     |
//! | session tracker      | `session_progress`  | upsert `(user, session)`   |
//! | legacy compatibility | `legacy_call_records` | insert                   |

pub mod memory;
pub mod rest;
pub mod store;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use memory::MemoryStore;
pub use rest::RestDataStore;
pub use store::DataStore;
pub use types::{LegacyCallRecord, SessionProgress, StoredConversation, VectorRecord};

use std::sync::Arc;

use dg_domain::config::{DatastoreConfig, DatastoreMode};
use dg_domain::error::Result;

/// Create the appropriate [`DataStore`] based on the configured mode.
pub fn create_store(cfg: &DatastoreConfig) -> Result<Arc<dyn DataStore>> {
    match cfg.mode {
        DatastoreMode::Rest => {
            let client = RestDataStore::new(cfg)?;
            Ok(Arc::new(client))
        }
        DatastoreMode::Memory => {
            tracing::warn!("datastore in memory mode; data will not survive a restart");
            Ok(Arc::new(MemoryStore::with_default_knowledge()))
        }
    }
}
