//! Error types for composer core operations.

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use thiserror::Error;

use crate::types::LocalImageId;

/// Errors raised while editing or (de)serializing a document.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum DocumentError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to serialize document: {0}")]
    #[diagnostic(code(document::serialize))]
    Serialize(String),

    /// Path does not point at a block, or offset lies past the block's end.
    #[error("invalid position {offset} in block {path}")]
    #[diagnostic(code(document::position))]
    InvalidPosition { path: String, offset: usize },

    /// Operation needs inline content but the block is an atom or container.
    #[error("block {path} does not hold inline content")]
    #[diagnostic(code(document::not_textblock))]
    NotTextblock { path: String },

    #[error("image {0} is already placed in the document")]
    #[diagnostic(code(document::duplicate_image))]
    DuplicateImage(LocalImageId),
}

/// Serialized document failed to parse, with the failing location.
#[derive(Error, Debug, Diagnostic)]
#[error("document parse error at line {line}, column {column}: {message}")]
#[diagnostic(code(document::parse))]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    location: SourceSpan,
}

impl ParseError {
    pub(crate) fn from_json(err: serde_json::Error, src: &str) -> Self {
        let message = err.to_string();
        // Errors raised after buffering (tagged nodes, conversions) carry no
        // position; fall back to the first occurrence of the quoted value.
        let (line, column) = match (err.line(), err.column()) {
            (0, _) => locate_quoted(&message, src).unwrap_or((1, 1)),
            at => at,
        };
        let location = SourceSpan::new(
            SourceOffset::from_location(src, line, column.max(1)),
            0,
        );
        Self {
            line,
            column,
            message,
            src: NamedSource::new("document.json", src.to_string()),
            location,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 1-based line and column of the first backtick-quoted token of `message`,
/// found as a JSON string in `src`.
fn locate_quoted(message: &str, src: &str) -> Option<(usize, usize)> {
    let token = message.split('`').nth(1).filter(|t| !t.is_empty())?;
    let offset = src.find(&format!("\"{token}\""))?;
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    Some((line, offset - line_start + 1))
}

/// URL candidate could not be turned into an absolute URL.
///
/// Callers fall back to inserting the candidate as plain text.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassificationError {
    #[error("no URL found in {0:?}")]
    #[diagnostic(code(classify::no_url))]
    NoUrl(String),

    #[error("could not parse {input:?} as a URL: {reason}")]
    #[diagnostic(code(classify::unparseable))]
    Unparseable { input: String, reason: String },
}

/// Errors while picking or rehydrating local images.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ImageError {
    #[error("picked file is empty")]
    #[diagnostic(code(image::empty))]
    Empty,

    #[error("picked file is not an image (detected {mime_type})")]
    #[diagnostic(
        code(image::not_an_image),
        help("only image/* payloads can be placed in a post body")
    )]
    NotAnImage { mime_type: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),
}
