//! External collaborators the composer talks to.
//!
//! Implementations live with the host application (HTTP clients, realtime
//! sockets). The composer only depends on these traits.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

use crate::error::{CreateError, MetadataFetchError, TaxonomyError, UploadError};
use crate::submit::PostPayload;

/// Result of a media upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Preview metadata for an external URL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
}

/// One ranked category candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub id: SmolStr,
    pub label: String,
    pub score: f32,
}

/// The post as persisted by the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPost {
    pub id: SmolStr,
}

/// Progress callback, called with a fraction in `[0, 1]`.
pub type Progress<'a> = &'a (dyn Fn(f32) + Send + Sync);

#[trait_variant::make(Send)]
pub trait UploadEndpoint: Sync {
    async fn upload(
        &self,
        bytes: Bytes,
        mime_type: &str,
        progress: Progress<'_>,
    ) -> Result<UploadedMedia, UploadError>;
}

#[trait_variant::make(Send)]
pub trait MetadataEndpoint: Sync {
    async fn fetch(&self, url: &str) -> Result<LinkMetadata, MetadataFetchError>;
}

#[trait_variant::make(Send)]
pub trait TaxonomyEndpoint: Sync {
    async fn suggest(&self, text: &str) -> Result<Vec<CategorySuggestion>, TaxonomyError>;
}

#[trait_variant::make(Send)]
pub trait PostEndpoint: Sync {
    /// Create the post. `token` identifies this submission so the realtime
    /// layer can recognize its own echo.
    async fn create(&self, payload: &PostPayload, token: Uuid) -> Result<CreatedPost, CreateError>;
}

/// Realtime channel that is told about self-originated submissions.
pub trait BroadcastChannel: Send + Sync {
    fn remember(&self, token: Uuid);
}
