//! Ordered draft persistence.
//!
//! Each scope gets a slot holding an async lock and a sequence counter.
//! Every save and clear takes a ticket from the counter when it is issued
//! and then waits for the lock. Once it holds the lock:
//!
//! - a save whose ticket is no longer the newest is skipped, since a later
//!   save or clear for the same scope is already queued;
//! - otherwise the save reads the content *now*, through [`DraftSource`],
//!   and writes it.
//!
//! Writes for one scope are therefore totally ordered and the last-issued
//! operation always decides what ends up in storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::DraftBackend;
use crate::error::StoreError;
use crate::record::{DraftContent, DraftRecord};
use crate::scope::ScopeKey;

/// Supplies the latest content at the moment a save actually runs.
pub trait DraftSource: Send + Sync {
    /// `None` means the content is gone (e.g. the scope was switched away)
    /// and the save should not write.
    fn current(&self) -> Option<DraftContent>;
}

impl DraftSource for DraftContent {
    fn current(&self) -> Option<DraftContent> {
        Some(self.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// A later save or clear for the scope was issued first.
    Superseded,
    /// The source had no content to write.
    Detached,
}

#[derive(Debug, Default)]
struct Slot {
    lock: tokio::sync::Mutex<()>,
    issued: AtomicU64,
}

impl Slot {
    fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket
    }
}

pub struct DraftStore<B> {
    backend: B,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl<B: DraftBackend> DraftStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Persist the latest content for `scope`, in issue order.
    pub async fn save(&self, scope: &ScopeKey, source: &impl DraftSource) -> Result<SaveOutcome, StoreError> {
        let key = scope.storage_key();
        let slot = self.slot(&key);
        let ticket = slot.ticket();
        let _guard = slot.lock.lock().await;

        if !slot.is_latest(ticket) {
            tracing::debug!(%key, ticket, "save superseded");
            return Ok(SaveOutcome::Superseded);
        }
        let Some(content) = source.current() else {
            tracing::debug!(%key, ticket, "save detached");
            return Ok(SaveOutcome::Detached);
        };
        let record = content.into_record(key.clone());
        let json = serde_json::to_string(&record).map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;
        let bytes = json.len();
        self.backend.put(&key, json).await?;
        tracing::debug!(
            %key,
            ticket,
            bytes,
            images = record.pending_images.len(),
            "draft saved"
        );
        Ok(SaveOutcome::Written)
    }

    /// Load the draft for `scope`, dropping orphaned images.
    ///
    /// Runs under the scope's lock, so it sees every save issued before it.
    /// If garbage collection shrank the record, the shrunk record is written
    /// back before the lock is released.
    pub async fn load(&self, scope: &ScopeKey) -> Result<Option<DraftRecord>, StoreError> {
        let key = scope.storage_key();
        let slot = self.slot(&key);
        let _guard = slot.lock.lock().await;

        let Some(json) = self.backend.get(&key).await? else {
            return Ok(None);
        };
        let mut record: DraftRecord =
            serde_json::from_str(&json).map_err(|source| StoreError::Decode {
                key: key.clone(),
                source,
            })?;

        if record.garbage_collect() {
            tracing::debug!(%key, kept = record.pending_images.len(), "dropped orphaned draft images");
            let json = serde_json::to_string(&record).map_err(|source| StoreError::Encode {
                key: key.clone(),
                source,
            })?;
            self.backend.put(&key, json).await?;
        }
        Ok(Some(record))
    }

    /// Delete the draft for `scope`. Queued saves issued before this are skipped.
    pub async fn clear(&self, scope: &ScopeKey) -> Result<(), StoreError> {
        let key = scope.storage_key();
        let slot = self.slot(&key);
        let _ticket = slot.ticket();
        let _guard = slot.lock.lock().await;
        self.backend.delete(&key).await?;
        tracing::debug!(%key, "draft cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::scope::PostCategory;
    use jearn_composer_core::{Block, Document, Inline};

    fn scope() -> ScopeKey {
        ScopeKey::new("u1", PostCategory::Post, None).unwrap()
    }

    fn content(title: &str) -> DraftContent {
        DraftContent {
            title: title.into(),
            body: Document::from_blocks(vec![Block::paragraph(vec![Inline::text(title)])]),
            pending_images: vec![],
        }
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = DraftStore::new(MemoryBackend::new());
        assert_eq!(store.load(&scope()).await.unwrap(), None);

        let outcome = store.save(&scope(), &content("a")).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Written);
        let record = store.load(&scope()).await.unwrap().unwrap();
        assert_eq!(record.title, "a");
        assert_eq!(record.scope_key, "post-draft:u1:Post");

        store.clear(&scope()).await.unwrap();
        assert_eq!(store.load(&scope()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_decode_error() {
        let store = DraftStore::new(MemoryBackend::new());
        store
            .backend()
            .put(&scope().storage_key(), "not json".into())
            .await
            .unwrap();
        let err = store.load(&scope()).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    struct Gone;

    impl DraftSource for Gone {
        fn current(&self) -> Option<DraftContent> {
            None
        }
    }

    #[tokio::test]
    async fn test_detached_source_writes_nothing() {
        let store = DraftStore::new(MemoryBackend::new());
        assert_eq!(
            store.save(&scope(), &Gone).await.unwrap(),
            SaveOutcome::Detached
        );
        assert!(store.backend().is_empty().await);
    }
}
