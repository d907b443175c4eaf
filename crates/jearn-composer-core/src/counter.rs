//! Semantically weighted character counting.
//!
//! The count is what the over-limit indicator shows, not the byte size of
//! the post. Paragraphs and hard breaks each weigh one, tags weigh their `#`
//! plus value, math weighs its LaTeX source, and other atoms weigh nothing.

use crate::document::{Block, Document, Inline};

/// Default soft maximum for the indicator.
pub const MAX_CHARS: usize = 20_000;

/// Zero-width markers the editor uses internally and never counts.
pub fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}')
}

/// Length in scalar values with zero-width markers removed.
pub fn visible_len(s: &str) -> usize {
    s.chars().filter(|c| !is_zero_width(*c)).count()
}

/// Count of a document, ready for display against a maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CharacterCount {
    pub count: usize,
    pub max: usize,
}

impl CharacterCount {
    pub fn is_over_limit(&self) -> bool {
        self.count > self.max
    }

    /// Characters left before the limit; negative once over.
    pub fn remaining(&self) -> i64 {
        self.max as i64 - self.count as i64
    }
}

pub fn measure(doc: &Document, max: usize) -> CharacterCount {
    CharacterCount {
        count: count_characters(doc),
        max,
    }
}

/// Single walk over the tree. The total drops by one when non-zero, which
/// cancels the implicit trailing paragraph every document carries.
pub fn count_characters(doc: &Document) -> usize {
    let total = count_blocks(doc.blocks());
    total.saturating_sub(1)
}

fn count_blocks(blocks: &[Block]) -> usize {
    blocks
        .iter()
        .map(|block| match block {
            Block::Paragraph { content } => 1 + count_inlines(content),
            Block::Heading { content, .. } => count_inlines(content),
            Block::BulletList { content } => {
                content.iter().map(|item| count_blocks(&item.content)).sum()
            }
            Block::Blockquote { content } => count_blocks(content),
            Block::HorizontalRule | Block::LinkCard { .. } | Block::Embed { .. } => 0,
        })
        .sum()
}

fn count_inlines(content: &[Inline]) -> usize {
    content
        .iter()
        .map(|inline| match inline {
            Inline::Text { text, .. } => visible_len(text),
            Inline::HardBreak => 1,
            Inline::Tag { attrs } => 1 + visible_len(&attrs.value),
            Inline::Math { attrs } => visible_len(&attrs.source_latex),
            Inline::Mention { .. } | Inline::ImagePlaceholder { .. } | Inline::InlineLink { .. } => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ListItem;
    use crate::serialize::{parse, serialize};
    use crate::types::{ImageAttrs, LinkCardAttrs, LocalImageId};

    fn para(inlines: Vec<Inline>) -> Block {
        Block::paragraph(inlines)
    }

    #[test]
    fn test_empty_document_counts_zero() {
        assert_eq!(count_characters(&Document::new()), 0);
    }

    #[test]
    fn test_trailing_paragraph_adjustment() {
        // one paragraph "abc" => 1 + 3, minus the trailing-paragraph offset
        let doc = Document::from_blocks(vec![para(vec![Inline::text("abc")])]);
        assert_eq!(count_characters(&doc), 3);

        // a second empty paragraph adds one
        let doc = Document::from_blocks(vec![
            para(vec![Inline::text("abc")]),
            Block::empty_paragraph(),
        ]);
        assert_eq!(count_characters(&doc), 4);
    }

    #[test]
    fn test_atoms_are_weighted() {
        let doc = Document::from_blocks(vec![para(vec![
            Inline::text("a\u{200B}b"),
            Inline::HardBreak,
            Inline::tag("rust"),
            Inline::math("\\frac{1}{2}"),
            Inline::mention("0123456789abcdef01234567", "ann"),
            Inline::image(ImageAttrs::local(LocalImageId::new("i"))),
            Inline::inline_link("https://jearn.site", "a long display text"),
        ])]);
        // paragraph 1 + "ab" 2 + break 1 + "#rust" 5 + latex 11, minus 1
        assert_eq!(count_characters(&doc), 1 + 2 + 1 + 5 + 11 - 1);
    }

    #[test]
    fn test_block_atoms_and_nesting() {
        let doc = Document::from_blocks(vec![
            Block::heading(1, vec![Inline::text("head")]),
            Block::link_card(LinkCardAttrs::loading("https://example.com")),
            Block::BulletList {
                content: vec![
                    ListItem::new(vec![para(vec![Inline::text("x")])]),
                    ListItem::new(vec![para(vec![Inline::text("yz")])]),
                ],
            },
            Block::Blockquote {
                content: vec![para(vec![Inline::text("q")])],
            },
        ]);
        // heading 4, list 2 + 3, quote 2, minus 1
        assert_eq!(count_characters(&doc), 4 + 2 + 3 + 2 - 1);
    }

    #[test]
    fn test_unicode_counts_scalar_values() {
        let doc = Document::from_blocks(vec![para(vec![Inline::text("héllo 世界")])]);
        assert_eq!(count_characters(&doc), 8);
    }

    #[test]
    fn test_count_survives_round_trip() {
        let doc = Document::from_blocks(vec![
            para(vec![Inline::text("one"), Inline::tag("two"), Inline::math("3")]),
            Block::empty_paragraph(),
        ]);
        let reparsed = parse(&serialize(&doc).unwrap()).unwrap();
        assert_eq!(count_characters(&reparsed), count_characters(&doc));
    }

    #[test]
    fn test_over_limit_is_soft() {
        let long = "x".repeat(25);
        let doc = Document::from_blocks(vec![para(vec![Inline::text(long)])]);
        let count = measure(&doc, 20);
        assert!(count.is_over_limit());
        assert_eq!(count.remaining(), -5);
        assert_eq!(count.count, 25);
    }
}
