//! The typed document tree and its edit primitives.
//!
//! A [`Document`] is an ordered list of [`Block`]s. Paragraphs and headings
//! hold inline content; lists and blockquotes hold further blocks; link cards,
//! embeds and horizontal rules are leaves. Atoms occupy exactly one position
//! unit inside their textblock, so a cursor can sit before or after an atom
//! but never inside it.
//!
//! Positions are addressed with a [`BlockPath`] plus a unit offset. A path
//! step into a blockquote names the child block; a step into a bullet list
//! names the list item and then the child block of that item.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::DocumentError;
use crate::types::{
    EmbedAttrs, ImageAttrs, InlineLinkAttrs, LinkCardAttrs, LocalImageId, Mark, MathAttrs,
    MentionAttrs, TagAttrs,
};

/// Object replacement character, stands in for atoms in flattened text.
pub const ATOM_PLACEHOLDER: char = '\u{FFFC}';

/// Inline content of a paragraph or heading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    HardBreak,
    Mention {
        attrs: MentionAttrs,
    },
    Tag {
        attrs: TagAttrs,
    },
    Math {
        attrs: MathAttrs,
    },
    ImagePlaceholder {
        attrs: ImageAttrs,
    },
    InlineLink {
        attrs: InlineLinkAttrs,
    },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Inline::Text {
            text: text.into(),
            marks,
        }
    }

    pub fn mention(user_id: impl Into<SmolStr>, display_handle: impl Into<SmolStr>) -> Self {
        Inline::Mention {
            attrs: MentionAttrs {
                user_id: user_id.into(),
                display_handle: display_handle.into(),
            },
        }
    }

    pub fn tag(value: impl Into<SmolStr>) -> Self {
        Inline::Tag {
            attrs: TagAttrs {
                value: value.into(),
            },
        }
    }

    pub fn math(source_latex: impl Into<String>) -> Self {
        Inline::Math {
            attrs: MathAttrs {
                source_latex: source_latex.into(),
            },
        }
    }

    pub fn image(attrs: ImageAttrs) -> Self {
        Inline::ImagePlaceholder { attrs }
    }

    pub fn inline_link(href: impl Into<String>, display_text: impl Into<String>) -> Self {
        Inline::InlineLink {
            attrs: InlineLinkAttrs {
                href: href.into(),
                display_text: display_text.into(),
            },
        }
    }

    /// Number of position units this node occupies.
    pub fn units(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            _ => 1,
        }
    }

    pub fn is_atom(&self) -> bool {
        !matches!(self, Inline::Text { .. } | Inline::HardBreak)
    }
}

/// A list item holds blocks of its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "listItem")]
pub struct ListItem {
    pub content: Vec<Block>,
}

impl ListItem {
    pub fn new(content: Vec<Block>) -> Self {
        Self { content }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    Heading {
        attrs: HeadingAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Inline>,
    },
    BulletList {
        content: Vec<ListItem>,
    },
    Blockquote {
        content: Vec<Block>,
    },
    HorizontalRule,
    LinkCard {
        attrs: LinkCardAttrs,
    },
    Embed {
        attrs: EmbedAttrs,
    },
}

impl Block {
    pub fn empty_paragraph() -> Self {
        Block::Paragraph {
            content: Vec::new(),
        }
    }

    pub fn paragraph(content: Vec<Inline>) -> Self {
        Block::Paragraph { content }
    }

    /// Heading with the level clamped to 1..=3.
    pub fn heading(level: u8, content: Vec<Inline>) -> Self {
        Block::Heading {
            attrs: HeadingAttrs {
                level: level.clamp(1, 3),
            },
            content,
        }
    }

    pub fn link_card(attrs: LinkCardAttrs) -> Self {
        Block::LinkCard { attrs }
    }

    pub fn embed(attrs: EmbedAttrs) -> Self {
        Block::Embed { attrs }
    }

    /// Inline content, for textblocks only.
    pub fn inlines(&self) -> Option<&Vec<Inline>> {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn inlines_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn is_textblock(&self) -> bool {
        self.inlines().is_some()
    }

    pub fn is_atom(&self) -> bool {
        matches!(
            self,
            Block::LinkCard { .. } | Block::Embed { .. } | Block::HorizontalRule
        )
    }

    /// Textblock with no content at all.
    pub fn is_empty_textblock(&self) -> bool {
        self.inlines().is_some_and(|c| c.iter().all(|i| i.units() == 0))
    }

    /// Length of a textblock in position units.
    pub fn unit_len(&self) -> usize {
        self.inlines()
            .map(|c| c.iter().map(Inline::units).sum())
            .unwrap_or(0)
    }
}

/// Address of a block inside the tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlockPath(Vec<usize>);

impl BlockPath {
    pub fn new(steps: Vec<usize>) -> Self {
        Self(steps)
    }

    pub fn top(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn steps(&self) -> &[usize] {
        &self.0
    }

    /// Path of the following sibling.
    pub fn next_sibling(&self) -> Self {
        let mut steps = self.0.clone();
        if let Some(last) = steps.last_mut() {
            *last += 1;
        }
        Self(steps)
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "[{}]", parts.join("."))
    }
}

/// Collapsed cursor inside a textblock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub block: BlockPath,
    /// Offset in position units from the start of the block.
    pub offset: usize,
}

impl Cursor {
    pub fn new(block: BlockPath, offset: usize) -> Self {
        Self { block, offset }
    }

    pub fn start_of(block: BlockPath) -> Self {
        Self { block, offset: 0 }
    }
}

/// Typed document tree. A fresh document is one empty paragraph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DocRepr", into = "DocRepr")]
pub struct Document {
    blocks: Vec<Block>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum DocRepr {
    Doc {
        #[serde(default)]
        content: Vec<Block>,
    },
}

impl TryFrom<DocRepr> for Document {
    type Error = DocumentError;

    /// Image placeholders must stay unique once parsed.
    fn try_from(repr: DocRepr) -> Result<Self, Self::Error> {
        let DocRepr::Doc { content } = repr;
        let doc = Document::from_blocks(content);
        let mut seen = HashSet::new();
        for id in doc.image_ids() {
            if !seen.insert(id.clone()) {
                return Err(DocumentError::DuplicateImage(id));
            }
        }
        Ok(doc)
    }
}

impl From<Document> for DocRepr {
    fn from(doc: Document) -> Self {
        DocRepr::Doc {
            content: doc.blocks,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Visitor callback target for [`Document::walk`].
pub enum Node<'a> {
    Block(&'a Block),
    ListItem(&'a ListItem),
    Inline(&'a Inline),
}

impl Document {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::empty_paragraph()],
        }
    }

    /// Build a document, keeping the "never empty" shape.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            Self::new()
        } else {
            Self { blocks }
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// True when the document holds nothing but empty paragraphs.
    pub fn is_empty(&self) -> bool {
        self.blocks
            .iter()
            .all(|b| matches!(b, Block::Paragraph { .. }) && b.is_empty_textblock())
    }

    /// Depth-first pre-order traversal over every node.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(Node<'a>)) {
        fn walk_blocks<'a>(blocks: &'a [Block], visit: &mut impl FnMut(Node<'a>)) {
            for block in blocks {
                visit(Node::Block(block));
                match block {
                    Block::Paragraph { content } | Block::Heading { content, .. } => {
                        for inline in content {
                            visit(Node::Inline(inline));
                        }
                    }
                    Block::BulletList { content } => {
                        for item in content {
                            visit(Node::ListItem(item));
                            walk_blocks(&item.content, visit);
                        }
                    }
                    Block::Blockquote { content } => walk_blocks(content, visit),
                    Block::HorizontalRule | Block::LinkCard { .. } | Block::Embed { .. } => {}
                }
            }
        }
        walk_blocks(&self.blocks, visit);
    }

    /// Every inline node, in document order.
    pub fn inlines(&self) -> Vec<&Inline> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let Node::Inline(inline) = node {
                out.push(inline);
            }
        });
        out
    }

    /// Local ids of every image placeholder, in document order.
    pub fn image_ids(&self) -> Vec<LocalImageId> {
        self.inlines()
            .into_iter()
            .filter_map(|inline| match inline {
                Inline::ImagePlaceholder { attrs } => Some(attrs.local_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn contains_image(&self, id: &LocalImageId) -> bool {
        self.image_ids().iter().any(|i| i == id)
    }

    /// Apply `f` to every image placeholder attribute set.
    pub fn for_each_image_mut(&mut self, f: &mut impl FnMut(&mut ImageAttrs)) {
        for_each_inline_mut(&mut self.blocks, &mut |inline| {
            if let Inline::ImagePlaceholder { attrs } = inline {
                f(attrs);
            }
        });
    }

    /// Apply `f` to every link card whose URL equals `url`. Returns how many changed.
    pub fn update_link_cards(&mut self, url: &str, f: &mut impl FnMut(&mut LinkCardAttrs)) -> usize {
        fn visit(blocks: &mut [Block], url: &str, f: &mut impl FnMut(&mut LinkCardAttrs)) -> usize {
            let mut hits = 0;
            for block in blocks {
                match block {
                    Block::LinkCard { attrs } if attrs.url == url => {
                        f(attrs);
                        hits += 1;
                    }
                    Block::BulletList { content } => {
                        for item in content {
                            hits += visit(&mut item.content, url, f);
                        }
                    }
                    Block::Blockquote { content } => hits += visit(content, url, f),
                    _ => {}
                }
            }
            hits
        }
        visit(&mut self.blocks, url, f)
    }

    /// Link cards, in document order.
    pub fn link_cards(&self) -> Vec<&LinkCardAttrs> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if let Node::Block(Block::LinkCard { attrs }) = node {
                out.push(attrs);
            }
        });
        out
    }

    /// Remove zero-width marker characters from all text runs.
    pub fn strip_zero_width(&mut self) {
        for_each_inline_mut(&mut self.blocks, &mut |inline| {
            if let Inline::Text { text, .. } = inline {
                text.retain(|c| !crate::counter::is_zero_width(c));
            }
        });
        for_each_textblock_mut(&mut self.blocks, &mut normalize_inlines);
    }

    /// Cursor at the end of the last textblock, if there is one.
    pub fn end_cursor(&self) -> Option<Cursor> {
        let index = self.blocks.iter().rposition(Block::is_textblock)?;
        let block = &self.blocks[index];
        Some(Cursor::new(BlockPath::top(index), block.unit_len()))
    }

    pub fn block(&self, path: &BlockPath) -> Option<&Block> {
        let (siblings, index) = siblings(&self.blocks, path.steps())?;
        siblings.get(index)
    }

    fn textblock_mut(&mut self, path: &BlockPath) -> Result<&mut Vec<Inline>, DocumentError> {
        let (siblings, index) =
            siblings_mut(&mut self.blocks, path.steps()).ok_or_else(|| DocumentError::InvalidPosition {
                path: path.to_string(),
                offset: 0,
            })?;
        siblings
            .get_mut(index)
            .and_then(Block::inlines_mut)
            .ok_or_else(|| DocumentError::NotTextblock {
                path: path.to_string(),
            })
    }

    fn check_offset(&self, cursor: &Cursor) -> Result<(), DocumentError> {
        let block = self.block(&cursor.block).ok_or_else(|| DocumentError::InvalidPosition {
            path: cursor.block.to_string(),
            offset: cursor.offset,
        })?;
        if !block.is_textblock() {
            return Err(DocumentError::NotTextblock {
                path: cursor.block.to_string(),
            });
        }
        if cursor.offset > block.unit_len() {
            return Err(DocumentError::InvalidPosition {
                path: cursor.block.to_string(),
                offset: cursor.offset,
            });
        }
        Ok(())
    }

    /// Insert text at the cursor. The new run takes the marks of the text
    /// directly before it.
    pub fn insert_text(&mut self, cursor: &Cursor, text: &str) -> Result<Cursor, DocumentError> {
        self.check_offset(cursor)?;
        if text.is_empty() {
            return Ok(cursor.clone());
        }
        let content = self.textblock_mut(&cursor.block)?;
        let index = split_at_unit(content, cursor.offset);
        let marks = index
            .checked_sub(1)
            .and_then(|i| match &content[i] {
                Inline::Text { marks, .. } => Some(marks.clone()),
                _ => None,
            })
            .unwrap_or_default();
        content.insert(index, Inline::marked(text, marks));
        normalize_inlines(content);
        Ok(Cursor::new(
            cursor.block.clone(),
            cursor.offset + text.chars().count(),
        ))
    }

    /// Insert an inline node (atom or hard break) at the cursor.
    pub fn insert_inline(&mut self, cursor: &Cursor, inline: Inline) -> Result<Cursor, DocumentError> {
        self.check_offset(cursor)?;
        if let Inline::ImagePlaceholder { attrs } = &inline {
            if self.contains_image(&attrs.local_id) {
                return Err(DocumentError::DuplicateImage(attrs.local_id.clone()));
            }
        }
        let units = inline.units();
        let content = self.textblock_mut(&cursor.block)?;
        let index = split_at_unit(content, cursor.offset);
        content.insert(index, inline);
        normalize_inlines(content);
        Ok(Cursor::new(cursor.block.clone(), cursor.offset + units))
    }

    /// Delete `len` units starting at the cursor, within one textblock.
    pub fn delete_range(&mut self, cursor: &Cursor, len: usize) -> Result<Vec<Inline>, DocumentError> {
        let end = Cursor::new(cursor.block.clone(), cursor.offset + len);
        self.check_offset(cursor)?;
        self.check_offset(&end)?;
        let content = self.textblock_mut(&cursor.block)?;
        let start = split_at_unit(content, cursor.offset);
        let stop = split_at_unit(content, end.offset);
        let removed: Vec<Inline> = content.drain(start..stop).collect();
        normalize_inlines(content);
        Ok(removed)
    }

    /// Text of the textblock from its start up to the cursor. Atoms appear
    /// as [`ATOM_PLACEHOLDER`] so char offsets line up with position units.
    pub fn text_before(&self, cursor: &Cursor) -> Result<String, DocumentError> {
        self.check_offset(cursor)?;
        let content = self
            .block(&cursor.block)
            .and_then(Block::inlines)
            .ok_or_else(|| DocumentError::NotTextblock {
                path: cursor.block.to_string(),
            })?;
        let mut out = String::new();
        let mut remaining = cursor.offset;
        for inline in content {
            if remaining == 0 {
                break;
            }
            match inline {
                Inline::Text { text, .. } => {
                    let take = remaining.min(text.chars().count());
                    out.extend(text.chars().take(take));
                    remaining -= take;
                }
                Inline::HardBreak => {
                    out.push('\n');
                    remaining -= 1;
                }
                _ => {
                    out.push(ATOM_PLACEHOLDER);
                    remaining -= 1;
                }
            }
        }
        Ok(out)
    }

    /// Split the textblock at the cursor into two. The second half is always
    /// a paragraph. Returns a cursor at its start.
    pub fn split_block(&mut self, cursor: &Cursor) -> Result<Cursor, DocumentError> {
        self.check_offset(cursor)?;
        let (siblings, index) = siblings_mut(&mut self.blocks, cursor.block.steps()).ok_or_else(|| {
            DocumentError::InvalidPosition {
                path: cursor.block.to_string(),
                offset: cursor.offset,
            }
        })?;
        let content = siblings[index]
            .inlines_mut()
            .ok_or_else(|| DocumentError::NotTextblock {
                path: cursor.block.to_string(),
            })?;
        let at = split_at_unit(content, cursor.offset);
        let tail: Vec<Inline> = content.drain(at..).collect();
        normalize_inlines(content);
        siblings.insert(index + 1, Block::paragraph(tail));
        Ok(Cursor::start_of(cursor.block.next_sibling()))
    }

    /// Replace the block at `path` with `block` followed by a fresh empty
    /// paragraph. Returns a cursor at the start of that paragraph.
    pub fn replace_block_with_atom(&mut self, path: &BlockPath, block: Block) -> Result<Cursor, DocumentError> {
        let (siblings, index) =
            siblings_mut(&mut self.blocks, path.steps()).ok_or_else(|| DocumentError::InvalidPosition {
                path: path.to_string(),
                offset: 0,
            })?;
        siblings.splice(index..=index, [block, Block::empty_paragraph()]);
        Ok(Cursor::start_of(path.next_sibling()))
    }

    /// Insert `block` and a fresh empty paragraph after the block at `path`.
    pub fn insert_block_after(&mut self, path: &BlockPath, block: Block) -> Result<Cursor, DocumentError> {
        let (siblings, index) =
            siblings_mut(&mut self.blocks, path.steps()).ok_or_else(|| DocumentError::InvalidPosition {
                path: path.to_string(),
                offset: 0,
            })?;
        siblings.splice(index + 1..index + 1, [block, Block::empty_paragraph()]);
        Ok(Cursor::start_of(path.next_sibling().next_sibling()))
    }
}

fn siblings<'a>(blocks: &'a [Block], path: &[usize]) -> Option<(&'a [Block], usize)> {
    match path {
        [] => None,
        [index] => (*index < blocks.len()).then_some((blocks, *index)),
        [index, rest @ ..] => match blocks.get(*index)? {
            Block::Blockquote { content } => siblings(content, rest),
            Block::BulletList { content } => {
                let (item, rest) = rest.split_first()?;
                siblings(&content.get(*item)?.content, rest)
            }
            _ => None,
        },
    }
}

fn siblings_mut<'a>(blocks: &'a mut Vec<Block>, path: &[usize]) -> Option<(&'a mut Vec<Block>, usize)> {
    match path {
        [] => None,
        [index] => {
            if *index < blocks.len() {
                Some((blocks, *index))
            } else {
                None
            }
        }
        [index, rest @ ..] => match blocks.get_mut(*index)? {
            Block::Blockquote { content } => siblings_mut(content, rest),
            Block::BulletList { content } => {
                let (item, rest) = rest.split_first()?;
                siblings_mut(&mut content.get_mut(*item)?.content, rest)
            }
            _ => None,
        },
    }
}

fn for_each_inline_mut(blocks: &mut [Block], f: &mut impl FnMut(&mut Inline)) {
    for block in blocks {
        match block {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                content.iter_mut().for_each(&mut *f);
            }
            Block::BulletList { content } => {
                for item in content {
                    for_each_inline_mut(&mut item.content, f);
                }
            }
            Block::Blockquote { content } => for_each_inline_mut(content, f),
            _ => {}
        }
    }
}

fn for_each_textblock_mut(blocks: &mut [Block], f: &mut impl FnMut(&mut Vec<Inline>)) {
    for block in blocks {
        match block {
            Block::Paragraph { content } | Block::Heading { content, .. } => f(content),
            Block::BulletList { content } => {
                for item in content {
                    for_each_textblock_mut(&mut item.content, f);
                }
            }
            Block::Blockquote { content } => for_each_textblock_mut(content, f),
            _ => {}
        }
    }
}

/// Ensure a node boundary at `offset` and return the vec index there.
fn split_at_unit(content: &mut Vec<Inline>, offset: usize) -> usize {
    let mut seen = 0;
    for index in 0..content.len() {
        if seen == offset {
            return index;
        }
        let units = content[index].units();
        if offset < seen + units {
            if let Inline::Text { text, marks } = &content[index] {
                let split = text
                    .char_indices()
                    .nth(offset - seen)
                    .map(|(byte, _)| byte)
                    .unwrap_or(text.len());
                let tail = Inline::marked(&text[split..], marks.clone());
                let head = Inline::marked(&text[..split], marks.clone());
                content[index] = head;
                content.insert(index + 1, tail);
                return index + 1;
            }
        }
        seen += units;
    }
    content.len()
}

/// Merge adjacent text runs with equal marks and drop empty runs.
fn normalize_inlines(content: &mut Vec<Inline>) {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for inline in content.drain(..) {
        if matches!(&inline, Inline::Text { text, .. } if text.is_empty()) {
            continue;
        }
        if let (
            Some(Inline::Text {
                text: prev,
                marks: prev_marks,
            }),
            Inline::Text { text, marks },
        ) = (out.last_mut(), &inline)
        {
            if prev_marks == marks {
                prev.push_str(text);
                continue;
            }
        }
        out.push(inline);
    }
    *content = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageAttrs, LinkCardStatus};
    use pretty_assertions::assert_eq;

    fn para(text: &str) -> Block {
        Block::paragraph(vec![Inline::text(text)])
    }

    #[test]
    fn test_new_document_is_one_empty_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.blocks(), &[Block::empty_paragraph()]);
        assert!(doc.is_empty());
        assert_eq!(Document::from_blocks(vec![]), doc);
    }

    #[test]
    fn test_insert_text_inherits_marks_and_merges() {
        let mut doc = Document::from_blocks(vec![Block::paragraph(vec![Inline::marked(
            "bold",
            vec![Mark::Bold],
        )])]);
        let cursor = Cursor::new(BlockPath::top(0), 4);
        let after = doc.insert_text(&cursor, "er").unwrap();
        assert_eq!(after.offset, 6);
        assert_eq!(
            doc.blocks()[0].inlines().unwrap(),
            &vec![Inline::marked("bolder", vec![Mark::Bold])]
        );
    }

    #[test]
    fn test_atoms_occupy_one_unit() {
        let mut doc = Document::from_blocks(vec![para("hi there")]);
        let cursor = Cursor::new(BlockPath::top(0), 2);
        let after = doc
            .insert_inline(&cursor, Inline::mention("0123456789abcdef01234567", "ann"))
            .unwrap();
        assert_eq!(after.offset, 3);
        assert_eq!(doc.blocks()[0].unit_len(), 9);
        let text = doc.text_before(&Cursor::new(BlockPath::top(0), 4)).unwrap();
        assert_eq!(text, format!("hi{} ", ATOM_PLACEHOLDER));
    }

    #[test]
    fn test_offset_past_end_is_rejected() {
        let mut doc = Document::from_blocks(vec![para("abc")]);
        let err = doc
            .insert_text(&Cursor::new(BlockPath::top(0), 4), "x")
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPosition { .. }));
    }

    #[test]
    fn test_duplicate_image_rejected() {
        let mut doc = Document::new();
        let id = LocalImageId::new("img-1");
        let cursor = Cursor::start_of(BlockPath::top(0));
        let cursor = doc
            .insert_inline(&cursor, Inline::image(ImageAttrs::local(id.clone())))
            .unwrap();
        let err = doc
            .insert_inline(&cursor, Inline::image(ImageAttrs::local(id)))
            .unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateImage(_)));
    }

    #[test]
    fn test_delete_range_splits_text() {
        let mut doc = Document::from_blocks(vec![para("hello world")]);
        let removed = doc
            .delete_range(&Cursor::new(BlockPath::top(0), 5), 6)
            .unwrap();
        assert_eq!(removed, vec![Inline::text(" world")]);
        assert_eq!(doc.blocks()[0], para("hello"));
    }

    #[test]
    fn test_replace_block_in_nested_list() {
        let mut doc = Document::from_blocks(vec![Block::BulletList {
            content: vec![ListItem::new(vec![para("one")]), ListItem::new(vec![para("two")])],
        }]);
        let path = BlockPath::new(vec![0, 1, 0]);
        let cursor = doc
            .replace_block_with_atom(&path, Block::link_card(LinkCardAttrs::loading("https://a.io")))
            .unwrap();
        assert_eq!(cursor, Cursor::start_of(BlockPath::new(vec![0, 1, 1])));
        assert!(doc.block(&cursor.block).unwrap().is_empty_textblock());
        assert_eq!(doc.link_cards()[0].status, LinkCardStatus::Loading);
    }

    #[test]
    fn test_update_link_cards_by_url() {
        let mut doc = Document::from_blocks(vec![
            Block::link_card(LinkCardAttrs::loading("https://a.io")),
            Block::Blockquote {
                content: vec![Block::link_card(LinkCardAttrs::loading("https://a.io"))],
            },
            Block::link_card(LinkCardAttrs::loading("https://b.io")),
        ]);
        let hits = doc.update_link_cards("https://a.io", &mut |card| {
            card.status = LinkCardStatus::Ready;
        });
        assert_eq!(hits, 2);
        let statuses: Vec<_> = doc.link_cards().iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![LinkCardStatus::Ready, LinkCardStatus::Ready, LinkCardStatus::Loading]
        );
    }

    #[test]
    fn test_strip_zero_width() {
        let mut doc = Document::from_blocks(vec![para("a\u{200B}b\u{FEFF}")]);
        doc.strip_zero_width();
        assert_eq!(doc.blocks()[0], para("ab"));
    }
}
