//! Single-slot race data store.
//!
//! The store holds at most one [`RaceDataDocument`]. Every `put` replaces the
//! slot wholesale; nothing is ever merged or deleted. Contents live only as
//! long as the process.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::schema::RaceDataDocument;

/// Identifier of the only record the store ever holds.
pub const RECORD_ID: u32 = 1;

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRecord {
    /// Always [`RECORD_ID`].
    pub id: u32,
    /// When the document was stored.
    pub stored_at: DateTime<Utc>,
    /// BLAKE3 digest of the document contents.
    pub digest: String,
    /// The stored document.
    pub data: RaceDataDocument,
}

/// Storage seam used by the HTTP layer.
///
/// `put` and `get` cannot fail: absence is a normal answer, and documents
/// arrive already validated.
#[async_trait]
pub trait RaceDataRepository: Send + Sync + std::fmt::Debug {
    /// Replace the current document, returning the stored record.
    async fn put(&self, document: RaceDataDocument) -> Arc<StoredRecord>;

    /// The current record, or `None` if nothing has been stored yet.
    async fn current(&self) -> Option<Arc<StoredRecord>>;

    /// The current document, or `None` if nothing has been stored yet.
    async fn get(&self) -> Option<RaceDataDocument> {
        self.current().await.map(|record| record.data.clone())
    }
}

/// In-memory [`RaceDataRepository`].
///
/// Readers clone the `Arc` out of the slot and writers swap a fresh one in,
/// so a reader observes either the previous or the new record in full.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<Arc<StoredRecord>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a document has been stored.
    pub async fn is_empty(&self) -> bool {
        self.slot.read().await.is_none()
    }
}

#[async_trait]
impl RaceDataRepository for MemoryStore {
    async fn put(&self, document: RaceDataDocument) -> Arc<StoredRecord> {
        let record = Arc::new(StoredRecord {
            id: RECORD_ID,
            stored_at: Utc::now(),
            digest: document.digest(),
            data: document,
        });

        let previous = self.slot.write().await.replace(Arc::clone(&record));
        if let Some(previous) = previous {
            debug!("Replacing race data with digest {}", &previous.digest[..16]);
        }

        info!(
            "Stored race data for '{}' ({} races, digest {})",
            record.data.profile_info.driver_name,
            record.data.races_data.len(),
            &record.digest[..16]
        );
        record
    }

    async fn current(&self) -> Option<Arc<StoredRecord>> {
        self.slot.read().await.clone()
    }
}
