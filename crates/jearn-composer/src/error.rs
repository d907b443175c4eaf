use std::path::PathBuf;

use jearn_composer_core::{DocumentError, ImageError};
use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for composer operations
#[derive(Debug, Error, Diagnostic)]
pub enum ComposerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// An operation needs a mounted composer but no scope is active.
    #[error("no composer scope is active")]
    #[diagnostic(code(composer::inactive))]
    NoActiveScope,
}

/// Scope key construction errors
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("{category} drafts need a parent id")]
    #[diagnostic(code(scope::missing_parent))]
    MissingParent { category: &'static str },

    #[error("user id must not be empty")]
    #[diagnostic(code(scope::empty_user))]
    EmptyUser,

    #[error("unrecognized storage key {0:?}")]
    #[diagnostic(code(scope::bad_key))]
    BadKey(String),
}

/// Draft persistence errors
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum StoreError {
    #[error("failed to access draft storage at {}", path.display())]
    #[diagnostic(code(store::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode draft {key}")]
    #[diagnostic(code(store::encode))]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode draft {key}")]
    #[diagnostic(code(store::decode), help("the stored draft is corrupt and can be discarded"))]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("draft backend failed: {0}")]
    #[diagnostic(code(store::backend))]
    Backend(String),
}

/// Media upload failure. The only failure that aborts a submission.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UploadError {
    #[error("upload rejected: {0}")]
    #[diagnostic(code(upload::rejected))]
    Rejected(String),

    #[error("upload failed: {0}")]
    #[diagnostic(code(upload::transport))]
    Transport(String),

    #[error("image {0} has no stored bytes")]
    #[diagnostic(code(upload::missing_bytes))]
    MissingBytes(String),
}

/// Link preview metadata could not be fetched.
///
/// Caught at the link card: the card shows its fallback label.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("metadata fetch for {url} failed: {message}")]
#[diagnostic(code(metadata::fetch))]
pub struct MetadataFetchError {
    pub url: String,
    pub message: String,
}

/// Taxonomy suggestion request failed.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("category suggestion failed: {0}")]
#[diagnostic(code(taxonomy::suggest))]
pub struct TaxonomyError(pub String);

/// Post creation endpoint rejected the payload.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[error("post creation failed: {0}")]
#[diagnostic(code(post::create))]
pub struct CreateError(pub String);

/// A submission that did not validate.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("a title is required")]
    #[diagnostic(code(validate::title))]
    MissingTitle,

    #[error("title exceeds {max} characters")]
    #[diagnostic(code(validate::title_length))]
    TitleTooLong { max: usize },

    #[error("pick at least one category")]
    #[diagnostic(code(validate::category))]
    MissingCategory,

    #[error("a poll needs at least two options")]
    #[diagnostic(code(validate::poll))]
    PollTooShort,

    #[error("a video post needs a video")]
    #[diagnostic(code(validate::video))]
    MissingVideo,

    #[error("nothing to post")]
    #[diagnostic(code(validate::empty))]
    Empty,
}

/// Submission pipeline errors
#[derive(Debug, Error, Diagnostic)]
pub enum SubmitError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] ValidationError),

    #[error("uploading media {index} failed")]
    #[diagnostic(code(submit::upload))]
    Upload {
        index: usize,
        #[source]
        #[diagnostic_source]
        source: UploadError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Create(#[from] CreateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error("post was created but the draft could not be cleared")]
    #[diagnostic(code(submit::store))]
    Store(#[source] StoreError),
}

/// Configuration errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    #[diagnostic(code(config::parse))]
    Parse(#[source] toml::de::Error),

    #[error("invalid value for {var}: {message}")]
    #[diagnostic(code(config::invalid))]
    Invalid { var: &'static str, message: String },
}
