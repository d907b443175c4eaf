//! jearn-composer: drafts, sessions and submission for the post composer.
//!
//! Builds on `jearn-composer-core` with everything that waits on storage or
//! the network:
//! - `DraftStore` - ordered per-scope persistence over a `DraftBackend`
//! - `ComposerSession` - one live composer, scope switching and restore
//! - `SubmissionPipeline` - validation, uploads and post creation
//! - collaborator traits for the endpoints the host application provides

pub mod backend;
pub mod collab;
pub mod config;
pub mod error;
pub mod link_cards;
pub mod record;
pub mod scope;
pub mod session;
pub mod store;
pub mod submit;
pub mod taxonomy;
pub mod telemetry;
pub mod tokens;

pub use backend::{ConfiguredBackend, DraftBackend, FileBackend, MemoryBackend};
pub use collab::{
    BroadcastChannel, CategorySuggestion, CreatedPost, LinkMetadata, MetadataEndpoint,
    PostEndpoint, Progress, TaxonomyEndpoint, UploadEndpoint, UploadedMedia,
};
pub use config::ComposerConfig;
pub use error::{
    ComposerError, ConfigError, CreateError, MetadataFetchError, ScopeError, StoreError,
    SubmitError, TaxonomyError, UploadError, ValidationError,
};
pub use record::{DraftContent, DraftRecord};
pub use scope::{PostCategory, ScopeKey};
pub use session::{Attachments, ComposerSession, InitialContent, RestoreOutcome};
pub use store::{DraftSource, DraftStore, SaveOutcome};
pub use submit::{Poll, PostPayload, SubmissionPipeline, SubmitRequest, VideoAttachment};
pub use taxonomy::CategoryPicker;
pub use tokens::RecentTokens;
