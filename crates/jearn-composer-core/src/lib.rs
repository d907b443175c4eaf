//! jearn-composer-core: post composer logic without framework dependencies.
//!
//! This crate provides:
//! - `Document` - the typed block/inline tree with atoms, and its JSON form
//! - Character counting and HTML rendering over that tree
//! - `UrlClassifier` - embed vs. link card vs. internal link at edit time
//! - `ImageLifecycle` - locally picked images, previews and garbage collection
//! - `ComposerState` - title and body with coordinated undo/redo
//!
//! Everything here is synchronous. Time-dependent behaviour takes the current
//! `web_time::Instant` as an argument.

pub mod classify;
pub mod coordinator;
pub mod counter;
pub mod document;
pub mod editor;
pub mod embed;
pub mod error;
pub mod extract;
pub mod history;
pub mod html;
pub mod images;
pub mod serialize;
pub mod types;

pub use classify::{
    Classification, Classified, Clipboard, InternalLink, InternalLinkChoice, PendingInternalLink,
    UrlClassifier,
};
pub use coordinator::{
    ComposerState, CoordinatorMode, FocusArea, HistoryConfig, Shortcut, UndoOutcome,
};
pub use counter::{CharacterCount, MAX_CHARS, count_characters};
pub use document::{Block, BlockPath, Cursor, Document, Inline, ListItem};
pub use editor::{BodyEditor, TitleField};
pub use embed::EmbedFrame;
pub use error::{ClassificationError, DocumentError, ImageError, ParseError};
pub use history::{BurstHistory, UndoManager};
pub use images::{ImageLifecycle, PendingImage, PreviewHandle, garbage_collect};
pub use smol_str::SmolStr;
pub use types::{
    EmbedAttrs, EmbedProvider, ImageAttrs, ImageStatus, LinkCardAttrs, LinkCardStatus,
    LocalImageId, Mark,
};
pub use web_time::Instant;
