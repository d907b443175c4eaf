//! Lifecycle of locally picked images.
//!
//! A picked image is kept as raw bytes ([`PendingImage`]) until submission
//! uploads it. The body only holds an [`Inline::ImagePlaceholder`] naming it
//! by local id. A [`PreviewHandle`] lets the placeholder display the bytes
//! before upload; it is rebuilt from the bytes whenever a draft is restored
//! and is never persisted itself.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use web_time::Instant;

use crate::document::{Document, Inline};
use crate::editor::BodyEditor;
use crate::error::ImageError;
use crate::types::{ImageAttrs, LocalImageId};

/// Image bytes waiting for upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingImage {
    pub id: LocalImageId,
    #[serde(with = "base64_bytes")]
    pub bytes: Bytes,
    pub mime_type: SmolStr,
}

impl PendingImage {
    /// Sniff the payload and reject anything that is not an image. A caller
    /// supplied hint is only used when sniffing is inconclusive.
    pub fn from_bytes(id: LocalImageId, bytes: Bytes, hint: Option<&str>) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let mime_type = bytes
            .sniff_mime_type()
            .or(hint)
            .unwrap_or("application/octet-stream");
        if !mime_type.starts_with("image/") {
            return Err(ImageError::NotAnImage {
                mime_type: mime_type.to_string(),
            });
        }
        let mime_type = SmolStr::new(mime_type);
        Ok(Self {
            id,
            bytes,
            mime_type,
        })
    }

    /// Content address of the bytes.
    pub fn digest(&self) -> blake3::Hash {
        blake3::hash(&self.bytes)
    }
}

/// Display-only preview of pending bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    data_url: String,
    digest: blake3::Hash,
}

impl PreviewHandle {
    pub fn for_image(image: &PendingImage) -> Self {
        Self {
            data_url: format!(
                "data:{};base64,{}",
                image.mime_type,
                STANDARD.encode(&image.bytes)
            ),
            digest: image.digest(),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn digest(&self) -> &blake3::Hash {
        &self.digest
    }
}

/// Keep only the images the document still references.
///
/// Returns true if anything was dropped.
pub fn garbage_collect(images: &mut Vec<PendingImage>, doc: &Document) -> bool {
    let referenced = doc.image_ids();
    let before = images.len();
    images.retain(|image| referenced.contains(&image.id));
    images.len() != before
}

/// Tracks pending bytes and their previews for the live body.
#[derive(Clone, Debug, Default)]
pub struct ImageLifecycle {
    pending: Vec<PendingImage>,
    previews: HashMap<LocalImageId, PreviewHandle>,
}

impl ImageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[PendingImage] {
        &self.pending
    }

    pub fn preview(&self, id: &LocalImageId) -> Option<&PreviewHandle> {
        self.previews.get(id)
    }

    /// Place a freshly picked image at the editor cursor.
    pub fn insert_local(
        &mut self,
        editor: &mut BodyEditor,
        bytes: Bytes,
        hint: Option<&str>,
        now: Instant,
    ) -> Result<LocalImageId, ImageError> {
        let image = PendingImage::from_bytes(LocalImageId::generate(), bytes, hint)?;
        let id = image.id.clone();
        editor.insert_inline(Inline::image(ImageAttrs::local(id.clone())), now)?;
        tracing::debug!(
            id = %id,
            mime = %image.mime_type,
            size = image.bytes.len(),
            digest = %image.digest().to_hex(),
            "placed local image"
        );
        self.previews.insert(id.clone(), PreviewHandle::for_image(&image));
        self.pending.push(image);
        Ok(id)
    }

    /// Second restore phase: bind previews to placeholders of a mounted body.
    ///
    /// Images without a placeholder in `doc` are dropped. Returns the ids
    /// that got a preview.
    pub fn rehydrate(&mut self, images: Vec<PendingImage>, doc: &Document) -> Vec<LocalImageId> {
        self.pending.clear();
        self.previews.clear();
        let referenced = doc.image_ids();
        let mut bound = Vec::new();
        for image in images {
            if !referenced.contains(&image.id) {
                tracing::debug!(id = %image.id, "skipping preview for unreferenced image");
                continue;
            }
            self.previews
                .insert(image.id.clone(), PreviewHandle::for_image(&image));
            bound.push(image.id.clone());
            self.pending.push(image);
        }
        bound
    }

    /// Drop pending bytes and previews the body no longer references.
    pub fn collect(&mut self, doc: &Document) -> bool {
        let shrank = garbage_collect(&mut self.pending, doc);
        if shrank {
            let live: Vec<&LocalImageId> = self.pending.iter().map(|i| &i.id).collect();
            self.previews.retain(|id, _| live.contains(&id));
        }
        shrank
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.previews.clear();
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
