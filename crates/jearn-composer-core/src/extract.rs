//! Structured data pulled out of a finished document at submission time.

use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;

use crate::classify::UrlClassifier;
use crate::document::{Block, Document, Inline, Node};

static OBJECT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-f0-9]{24}$").unwrap());

/// True for a 24 hex digit object id.
pub fn is_object_id(s: &str) -> bool {
    OBJECT_ID_RE.is_match(s)
}

/// Canonical form of a hashtag: lower-cased with underscores removed.
pub fn normalize_tag(value: &str) -> String {
    value.to_lowercase().replace('_', "").trim().to_string()
}

fn push_unique(out: &mut Vec<SmolStr>, value: SmolStr) {
    if !out.contains(&value) {
        out.push(value);
    }
}

/// Hashtags in document order, normalized and deduplicated.
pub fn tags(doc: &Document) -> Vec<SmolStr> {
    let mut out = Vec::new();
    for inline in doc.inlines() {
        if let Inline::Tag { attrs } = inline {
            let tag = normalize_tag(&attrs.value);
            if !tag.is_empty() {
                push_unique(&mut out, SmolStr::new(tag));
            }
        }
    }
    out
}

/// Ids of mentioned users. Mentions without a valid object id are skipped.
pub fn mentioned_user_ids(doc: &Document) -> Vec<SmolStr> {
    let mut out = Vec::new();
    for inline in doc.inlines() {
        if let Inline::Mention { attrs } = inline {
            if is_object_id(&attrs.user_id) {
                push_unique(&mut out, attrs.user_id.clone());
            }
        }
    }
    out
}

/// Ids of platform posts referenced by inline links, link marks and cards.
pub fn references(doc: &Document, classifier: &UrlClassifier) -> Vec<SmolStr> {
    let mut out = Vec::new();
    doc.walk(&mut |node| {
        let found = match node {
            Node::Inline(Inline::InlineLink { attrs }) => classifier.internal_post_id_str(&attrs.href),
            Node::Inline(Inline::Text { marks, .. }) => marks
                .iter()
                .filter_map(|m| m.href())
                .find_map(|href| classifier.internal_post_id_str(href)),
            Node::Block(Block::LinkCard { attrs }) => classifier.internal_post_id_str(&attrs.url),
            _ => None,
        };
        if let Some(id) = found {
            push_unique(&mut out, id);
        }
    });
    out
}

/// Plain text of the body, blocks separated by newlines.
///
/// Math contributes its LaTeX source, tags and mentions their visible form.
/// Used as input for taxonomy suggestions.
pub fn plain_text(doc: &Document) -> String {
    fn blocks_text(blocks: &[Block], out: &mut Vec<String>) {
        for block in blocks {
            match block {
                Block::Paragraph { content } | Block::Heading { content, .. } => {
                    let mut line = String::new();
                    for inline in content {
                        match inline {
                            Inline::Text { text, .. } => line.push_str(text),
                            Inline::HardBreak => line.push('\n'),
                            Inline::Tag { attrs } => {
                                line.push('#');
                                line.push_str(&attrs.value);
                            }
                            Inline::Mention { attrs } => {
                                line.push('@');
                                line.push_str(&attrs.display_handle);
                            }
                            Inline::Math { attrs } => line.push_str(&attrs.source_latex),
                            Inline::InlineLink { attrs } => line.push_str(&attrs.display_text),
                            Inline::ImagePlaceholder { .. } => {}
                        }
                    }
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        out.push(line);
                    }
                }
                Block::BulletList { content } => {
                    for item in content {
                        blocks_text(&item.content, out);
                    }
                }
                Block::Blockquote { content } => blocks_text(content, out),
                Block::LinkCard { attrs } => {
                    if let Some(title) = &attrs.title {
                        out.push(title.clone());
                    }
                }
                Block::HorizontalRule | Block::Embed { .. } => {}
            }
        }
    }
    let mut lines = Vec::new();
    blocks_text(doc.blocks(), &mut lines);
    lines.join("\n")
}

/// True when the body holds media (images, embeds or cards).
pub fn has_media(doc: &Document) -> bool {
    let mut found = false;
    doc.walk(&mut |node| {
        if matches!(
            node,
            Node::Inline(Inline::ImagePlaceholder { .. })
                | Node::Block(Block::Embed { .. } | Block::LinkCard { .. })
        ) {
            found = true;
        }
    });
    found
}
