//! Edit-time URL classification.
//!
//! A URL reaches the classifier from a plain-text paste or from a word the
//! user just finished typing. It becomes one of three things:
//!
//! 1. an internal link to platform content, which asks the user whether to
//!    show a preview card or an inline link,
//! 2. an embed, for hosts on the allow-list,
//! 3. a link card in `loading` state, for everything else.
//!
//! Only the first URL of a trigger event is classified. Rich pastes are left
//! alone.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use url::Url;
use web_time::Instant;

use crate::document::{ATOM_PLACEHOLDER, Block, Cursor, Document, Inline};
use crate::editor::BodyEditor;
use crate::embed::{self, DEFAULT_EMBED_HOSTS};
use crate::error::{ClassificationError, DocumentError};
use crate::types::{EmbedAttrs, LinkCardAttrs};

pub const DEFAULT_OWN_DOMAIN: &str = "jearn.site";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://)?([a-z0-9-]+\.)+[a-z]{2,}(/\S*)?$").unwrap()
});

static POST_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/posts/([a-f0-9]{24})(?:/|$)").unwrap());

/// Link to a piece of platform content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalLink {
    pub url: String,
    pub post_id: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    InternalLink(InternalLink),
    Embed(EmbedAttrs),
    LinkCard(LinkCardAttrs),
}

/// Clipboard payload of a paste event.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    pub plain: Option<String>,
    pub html: Option<String>,
}

impl Clipboard {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain: Some(text.into()),
            html: None,
        }
    }

    pub fn is_rich(&self) -> bool {
        self.html.as_deref().is_some_and(|h| !h.trim().is_empty())
    }
}

/// Internal URL waiting for the user's presentation choice.
///
/// The URL text already sits in the body at `start` and spans `len` units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingInternalLink {
    pub link: InternalLink,
    pub start: Cursor,
    pub len: usize,
}

/// What the user picked for an internal link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InternalLinkChoice {
    Card,
    Inline { display_text: String },
}

/// Result of offering a trigger event to the classifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    /// Not a URL event; the caller proceeds with default handling.
    Ignored,
    /// Looked like a URL but did not parse; inserted as plain text.
    PlainText(ClassificationError),
    /// An atom block now sits in the body.
    Placed(Classification),
    InternalChoice(PendingInternalLink),
}

#[derive(Clone, Debug)]
pub struct UrlClassifier {
    own_domain: String,
    allow_list: Vec<String>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_OWN_DOMAIN, DEFAULT_EMBED_HOSTS.iter().copied())
    }
}

impl UrlClassifier {
    /// The own domain is always part of the allow-list.
    pub fn new<'a>(own_domain: &str, allow_list: impl IntoIterator<Item = &'a str>) -> Self {
        let own_domain = own_domain.trim_start_matches("www.").to_ascii_lowercase();
        let mut hosts: Vec<String> = allow_list
            .into_iter()
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
            .collect();
        if !hosts.contains(&own_domain) {
            hosts.push(own_domain.clone());
        }
        Self {
            own_domain,
            allow_list: hosts,
        }
    }

    pub fn own_domain(&self) -> &str {
        &self.own_domain
    }

    /// Trimmed candidate with `https://` prepended when it has no scheme.
    pub fn extract_url(text: &str) -> Option<String> {
        let trimmed = text.trim();
        if !URL_RE.is_match(trimmed) {
            return None;
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Some(trimmed.to_string())
        } else {
            Some(format!("https://{trimmed}"))
        }
    }

    /// Content id when `url` points at platform content.
    pub fn internal_post_id(&self, url: &Url) -> Option<SmolStr> {
        let host = embed::bare_host(url)?;
        if !embed::host_matches(&host, &self.own_domain) {
            return None;
        }
        POST_PATH_RE
            .captures(url.path())
            .map(|caps| SmolStr::new(&caps[1]))
    }

    /// Same as [`Self::internal_post_id`] for a raw string.
    pub fn internal_post_id_str(&self, raw: &str) -> Option<SmolStr> {
        Url::parse(raw)
            .ok()
            .and_then(|url| self.internal_post_id(&url))
    }

    fn is_embeddable(&self, host: &str) -> bool {
        self.allow_list.iter().any(|d| embed::host_matches(host, d))
    }

    /// Decide how a candidate should be presented.
    pub fn classify(&self, candidate: &str) -> Result<Classification, ClassificationError> {
        let normalized =
            Self::extract_url(candidate).ok_or_else(|| ClassificationError::NoUrl(candidate.to_string()))?;
        let url = Url::parse(&normalized).map_err(|e| ClassificationError::Unparseable {
            input: candidate.to_string(),
            reason: e.to_string(),
        })?;
        let host = embed::bare_host(&url).ok_or_else(|| ClassificationError::Unparseable {
            input: candidate.to_string(),
            reason: "missing host".to_string(),
        })?;

        if let Some(post_id) = self.internal_post_id(&url) {
            return Ok(Classification::InternalLink(InternalLink {
                url: normalized,
                post_id,
            }));
        }
        if self.is_embeddable(&host) {
            let provider = embed::provider_for(&host);
            return Ok(Classification::Embed(EmbedAttrs {
                normalized_url: embed::normalize(&url, provider),
                provider,
            }));
        }
        Ok(Classification::LinkCard(LinkCardAttrs::loading(normalized)))
    }

    /// Handle a paste. Only a plain-text payload is ever classified.
    pub fn handle_paste(
        &self,
        editor: &mut BodyEditor,
        clipboard: &Clipboard,
        now: Instant,
    ) -> Result<Classified, DocumentError> {
        if clipboard.is_rich() {
            return Ok(Classified::Ignored);
        }
        let Some(text) = clipboard.plain.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Classified::Ignored);
        };
        let first = text.split_whitespace().next().unwrap_or(text);
        if first.len() != text.len() {
            // multi-word paste: only a bare URL is treated as a link
            return Ok(Classified::Ignored);
        }

        match self.classify(text) {
            Err(ClassificationError::NoUrl(_)) => Ok(Classified::Ignored),
            Err(err) => {
                tracing::debug!(%err, "pasted URL did not parse, inserting as text");
                editor.insert_text(text, now)?;
                Ok(Classified::PlainText(err))
            }
            Ok(Classification::InternalLink(link)) => {
                let start = editor.cursor().clone();
                let len = link.url.chars().count();
                editor.insert_text(&link.url, now)?;
                Ok(Classified::InternalChoice(PendingInternalLink { link, start, len }))
            }
            Ok(classification) => {
                let block = atom_block(&classification);
                editor.edit(now, |doc, cursor| {
                    *cursor = place_block(doc, cursor, block)?;
                    Ok(())
                })?;
                Ok(Classified::Placed(classification))
            }
        }
    }

    /// Handle a word boundary typed at the cursor.
    ///
    /// On a match the boundary character is consumed; otherwise the caller
    /// inserts it as usual.
    pub fn handle_boundary(
        &self,
        editor: &mut BodyEditor,
        boundary: char,
        now: Instant,
    ) -> Result<Classified, DocumentError> {
        if !boundary.is_whitespace() {
            return Ok(Classified::Ignored);
        }
        let cursor = editor.cursor().clone();
        let is_paragraph = matches!(
            editor.document().block(&cursor.block),
            Some(Block::Paragraph { .. })
        );
        if !is_paragraph {
            return Ok(Classified::Ignored);
        }
        let before = editor.document().text_before(&cursor)?;
        let word: String = before
            .chars()
            .rev()
            .take_while(|c| !c.is_whitespace() && *c != ATOM_PLACEHOLDER)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if word.is_empty() {
            return Ok(Classified::Ignored);
        }
        let len = word.chars().count();
        let start = Cursor::new(cursor.block.clone(), cursor.offset - len);

        match self.classify(&word) {
            Err(ClassificationError::NoUrl(_)) => Ok(Classified::Ignored),
            Err(err) => Ok(Classified::PlainText(err)),
            Ok(Classification::InternalLink(link)) => {
                Ok(Classified::InternalChoice(PendingInternalLink { link, start, len }))
            }
            Ok(classification) => {
                let block = atom_block(&classification);
                editor.edit(now, |doc, cursor| {
                    doc.delete_range(&start, len)?;
                    *cursor = place_block(doc, &start, block)?;
                    Ok(())
                })?;
                Ok(Classified::Placed(classification))
            }
        }
    }

    /// Apply the user's choice for a pending internal link.
    pub fn resolve_internal(
        &self,
        editor: &mut BodyEditor,
        pending: &PendingInternalLink,
        choice: InternalLinkChoice,
        now: Instant,
    ) -> Result<(), DocumentError> {
        editor.edit(now, |doc, cursor| {
            doc.delete_range(&pending.start, pending.len)?;
            *cursor = match choice {
                InternalLinkChoice::Card => place_block(
                    doc,
                    &pending.start,
                    Block::link_card(LinkCardAttrs::loading(pending.link.url.clone())),
                )?,
                InternalLinkChoice::Inline { display_text } => {
                    let text = if display_text.trim().is_empty() {
                        pending.link.url.clone()
                    } else {
                        display_text.trim().to_string()
                    };
                    doc.insert_inline(
                        &pending.start,
                        Inline::inline_link(pending.link.url.clone(), text),
                    )?
                }
            };
            Ok(())
        })
    }
}

fn atom_block(classification: &Classification) -> Block {
    match classification {
        Classification::Embed(attrs) => Block::embed(attrs.clone()),
        Classification::LinkCard(attrs) => Block::link_card(attrs.clone()),
        Classification::InternalLink(link) => Block::link_card(LinkCardAttrs::loading(link.url.clone())),
    }
}

/// Put an atom block where the cursor's block is, followed by an empty
/// paragraph. An empty enclosing block is replaced; a block that still holds
/// content keeps it and gets the atom after it.
fn place_block(doc: &mut Document, cursor: &Cursor, block: Block) -> Result<Cursor, DocumentError> {
    let empty = doc
        .block(&cursor.block)
        .is_some_and(Block::is_empty_textblock);
    if empty {
        doc.replace_block_with_atom(&cursor.block, block)
    } else {
        doc.insert_block_after(&cursor.block, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockPath;
    use crate::types::{EmbedProvider, LinkCardStatus};
    use pretty_assertions::assert_eq;

    const POST_ID: &str = "0123456789abcdef01234567";

    fn paste(editor: &mut BodyEditor, text: &str) -> Classified {
        UrlClassifier::default()
            .handle_paste(editor, &Clipboard::plain(text), Instant::now())
            .unwrap()
    }

    #[test]
    fn test_youtube_short_link_becomes_embed() {
        let mut editor = BodyEditor::default();
        let outcome = paste(&mut editor, "https://youtu.be/abc123");
        let expected = EmbedAttrs {
            normalized_url: "https://www.youtube.com/embed/abc123".into(),
            provider: EmbedProvider::YouTube,
        };
        assert_eq!(outcome, Classified::Placed(Classification::Embed(expected.clone())));
        assert_eq!(
            editor.document().blocks(),
            &[Block::embed(expected), Block::empty_paragraph()]
        );
        assert_eq!(editor.cursor(), &Cursor::start_of(BlockPath::top(1)));
    }

    #[test]
    fn test_internal_url_extracts_post_id() {
        let mut editor = BodyEditor::default();
        let url = format!("https://jearn.site/posts/{POST_ID}");
        let Classified::InternalChoice(pending) = paste(&mut editor, &url) else {
            panic!("expected the internal link choice");
        };
        assert_eq!(pending.link.post_id, POST_ID);
        assert_eq!(pending.len, url.chars().count());
        assert_eq!(
            editor.document().blocks(),
            &[Block::paragraph(vec![Inline::text(url.clone())])]
        );
    }

    #[test]
    fn test_internal_link_inline_choice() {
        let classifier = UrlClassifier::default();
        let mut editor = BodyEditor::default();
        editor.insert_text("see ", Instant::now()).unwrap();
        let url = format!("jearn.site/posts/{POST_ID}");
        let Classified::InternalChoice(pending) = classifier
            .handle_paste(&mut editor, &Clipboard::plain(&url), Instant::now())
            .unwrap()
        else {
            panic!("expected the internal link choice");
        };
        classifier
            .resolve_internal(
                &mut editor,
                &pending,
                InternalLinkChoice::Inline {
                    display_text: "this post".into(),
                },
                Instant::now(),
            )
            .unwrap();
        assert_eq!(
            editor.document().blocks(),
            &[Block::paragraph(vec![
                Inline::text("see "),
                Inline::inline_link(format!("https://{url}"), "this post"),
            ])]
        );
    }

    #[test]
    fn test_internal_link_card_choice() {
        let classifier = UrlClassifier::default();
        let mut editor = BodyEditor::default();
        let url = format!("https://jearn.site/posts/{POST_ID}");
        let Classified::InternalChoice(pending) = classifier
            .handle_paste(&mut editor, &Clipboard::plain(&url), Instant::now())
            .unwrap()
        else {
            panic!("expected the internal link choice");
        };
        classifier
            .resolve_internal(&mut editor, &pending, InternalLinkChoice::Card, Instant::now())
            .unwrap();
        assert_eq!(
            editor.document().blocks(),
            &[
                Block::link_card(LinkCardAttrs::loading(url)),
                Block::empty_paragraph()
            ]
        );
    }

    #[test]
    fn test_other_url_becomes_loading_link_card() {
        let mut editor = BodyEditor::default();
        let outcome = paste(&mut editor, "https://example.com/article");
        assert_eq!(
            outcome,
            Classified::Placed(Classification::LinkCard(LinkCardAttrs::loading(
                "https://example.com/article"
            )))
        );
        assert_eq!(editor.document().link_cards()[0].status, LinkCardStatus::Loading);
    }

    #[test]
    fn test_rich_paste_is_not_classified() {
        let mut editor = BodyEditor::default();
        let clipboard = Clipboard {
            plain: Some("https://example.com".into()),
            html: Some("<a href=\"https://example.com\">x</a>".into()),
        };
        let outcome = UrlClassifier::default()
            .handle_paste(&mut editor, &clipboard, Instant::now())
            .unwrap();
        assert_eq!(outcome, Classified::Ignored);
        assert!(editor.document().is_empty());
    }

    #[test]
    fn test_typed_url_classified_on_space() {
        let classifier = UrlClassifier::default();
        let mut editor = BodyEditor::default();
        editor.insert_text("look open.spotify.com/track/1", Instant::now()).unwrap();
        let outcome = classifier
            .handle_boundary(&mut editor, ' ', Instant::now())
            .unwrap();
        assert!(matches!(
            outcome,
            Classified::Placed(Classification::Embed(EmbedAttrs {
                provider: EmbedProvider::Spotify,
                ..
            }))
        ));
        // preceding words stay, the embed follows
        assert_eq!(
            editor.document().blocks()[0],
            Block::paragraph(vec![Inline::text("look ")])
        );
        assert!(matches!(editor.document().blocks()[1], Block::Embed { .. }));
        assert_eq!(editor.cursor(), &Cursor::start_of(BlockPath::top(2)));
    }

    #[test]
    fn test_plain_words_are_ignored() {
        let classifier = UrlClassifier::default();
        let mut editor = BodyEditor::default();
        editor.insert_text("hello", Instant::now()).unwrap();
        let outcome = classifier
            .handle_boundary(&mut editor, ' ', Instant::now())
            .unwrap();
        assert_eq!(outcome, Classified::Ignored);
        assert_eq!(
            paste(&mut editor, "two words.com here"),
            Classified::Ignored
        );
    }

    #[test]
    fn test_non_url_candidate_is_no_url() {
        let err = UrlClassifier::default().classify("not a url").unwrap_err();
        assert!(matches!(err, ClassificationError::NoUrl(_)));
    }

    #[test]
    fn test_own_domain_non_post_is_platform_embed() {
        let c = UrlClassifier::default().classify("https://www.jearn.site/users/abc").unwrap();
        assert!(matches!(
            c,
            Classification::Embed(EmbedAttrs {
                provider: EmbedProvider::Platform,
                ..
            })
        ));
    }
}
