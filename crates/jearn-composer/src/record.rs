//! Persisted draft records.

use chrono::{DateTime, Utc};
use jearn_composer_core::{Document, PendingImage, garbage_collect};
use serde::{Deserialize, Serialize};

/// Everything needed to restore a composer for one scope.
///
/// Undo history is deliberately absent: it lives only in memory.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    /// Storage key of the scope this draft belongs to.
    pub scope_key: String,

    #[serde(default)]
    pub title: String,

    /// Canonical document JSON, embedded as an object.
    pub body: Document,

    /// Picked images not yet uploaded, bytes base64-encoded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_images: Vec<PendingImage>,

    pub updated_at: DateTime<Utc>,
}

impl DraftRecord {
    /// Drop pending images the body no longer references.
    ///
    /// Returns true if the record shrank.
    pub fn garbage_collect(&mut self) -> bool {
        garbage_collect(&mut self.pending_images, &self.body)
    }

    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.body.is_empty() && self.pending_images.is_empty()
    }
}

/// Title, body and images as they are right now, ready to persist.
#[derive(Clone, Debug, PartialEq)]
pub struct DraftContent {
    pub title: String,
    pub body: Document,
    pub pending_images: Vec<PendingImage>,
}

impl DraftContent {
    pub fn into_record(self, scope_key: String) -> DraftRecord {
        DraftRecord {
            scope_key,
            title: self.title,
            body: self.body,
            pending_images: self.pending_images,
            updated_at: Utc::now(),
        }
    }
}
