//! Node attribute types shared by the document tree, the serializer and the
//! HTML renderer.
//!
//! These types carry no editing behaviour. Atoms are defined here as plain
//! attribute records; `document` decides where they may appear.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Formatting applied to a run of text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link { attrs: LinkAttrs },
}

impl Mark {
    pub fn link(href: impl Into<SmolStr>) -> Self {
        Mark::Link {
            attrs: LinkAttrs { href: href.into() },
        }
    }

    pub fn href(&self) -> Option<&str> {
        match self {
            Mark::Link { attrs } => Some(&attrs.href),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: SmolStr,
}

/// Identifier of a locally picked image, unique within one document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalImageId(SmolStr);

impl LocalImageId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Fresh time-ordered id for a newly picked image.
    pub fn generate() -> Self {
        Self(SmolStr::new(format!("img-{}", uuid::Uuid::now_v7().simple())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalImageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// `@handle` reference to another user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionAttrs {
    pub user_id: SmolStr,
    pub display_handle: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAttrs {
    pub value: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MathAttrs {
    pub source_latex: String,
}

/// Upload state of an image placeholder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageStatus {
    /// Bytes only exist in the draft; nothing has been uploaded yet.
    #[default]
    Local,
    Uploaded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttrs {
    pub local_id: LocalImageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub status: ImageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImageAttrs {
    pub fn local(local_id: LocalImageId) -> Self {
        Self {
            local_id,
            remote_url: None,
            status: ImageStatus::Local,
            width: None,
            height: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.status == ImageStatus::Local
    }
}

/// A link rendered as an atom with its own display text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineLinkAttrs {
    pub href: String,
    pub display_text: String,
}

/// Metadata fetch state of a link card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkCardStatus {
    #[default]
    Loading,
    Ready,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCardAttrs {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default)]
    pub status: LinkCardStatus,
}

impl LinkCardAttrs {
    /// A card that still waits for its metadata.
    pub fn loading(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            description: None,
            image: None,
            site_name: None,
            status: LinkCardStatus::Loading,
        }
    }

    /// Host part of the card URL, used as the fallback label.
    pub fn domain(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
    }

    /// Label shown on the card: its title when known, the URL otherwise.
    pub fn label(&self) -> &str {
        match (&self.status, &self.title) {
            (LinkCardStatus::Ready, Some(title)) if !title.is_empty() => title,
            _ => &self.url,
        }
    }
}

/// Provider family of an embed, decided from the host at classification time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmbedProvider {
    YouTube,
    Spotify,
    X,
    /// The platform's own content.
    Platform,
}

impl EmbedProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedProvider::YouTube => "youtube",
            EmbedProvider::Spotify => "spotify",
            EmbedProvider::X => "x",
            EmbedProvider::Platform => "platform",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedAttrs {
    pub normalized_url: String,
    pub provider: EmbedProvider,
}
