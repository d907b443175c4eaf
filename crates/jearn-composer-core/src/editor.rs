//! Editable fields of the composer: the document body and the title.
//!
//! Both own their content together with a [`BurstHistory`], so every
//! mutation that goes through them is recorded for undo.

use std::time::Duration;

use web_time::Instant;

use crate::document::{Cursor, Document, Inline};
use crate::error::DocumentError;
use crate::history::{BurstHistory, DEFAULT_DEPTH, DEFAULT_GROUP_DELAY, UndoManager};
use crate::types::LinkCardAttrs;

/// Body content plus cursor, the unit stored in body history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyState {
    pub doc: Document,
    pub cursor: Cursor,
}

impl BodyState {
    fn at_end(doc: Document) -> Self {
        let cursor = doc.end_cursor().unwrap_or_default();
        Self { doc, cursor }
    }
}

/// The document body with its native history.
#[derive(Clone, Debug)]
pub struct BodyEditor {
    state: BodyState,
    history: BurstHistory<BodyState>,
}

impl Default for BodyEditor {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl BodyEditor {
    pub fn new(doc: Document) -> Self {
        Self::with_history(doc, DEFAULT_DEPTH, DEFAULT_GROUP_DELAY)
    }

    pub fn with_history(doc: Document, depth: usize, group_delay: Duration) -> Self {
        Self {
            state: BodyState::at_end(doc),
            history: BurstHistory::new(depth, group_delay),
        }
    }

    pub fn document(&self) -> &Document {
        &self.state.doc
    }

    pub fn cursor(&self) -> &Cursor {
        &self.state.cursor
    }

    /// Move the cursor. Does not touch history.
    pub fn set_cursor(&mut self, cursor: Cursor) -> Result<(), DocumentError> {
        let block = self
            .state
            .doc
            .block(&cursor.block)
            .ok_or_else(|| DocumentError::InvalidPosition {
                path: cursor.block.to_string(),
                offset: cursor.offset,
            })?;
        if !block.is_textblock() || cursor.offset > block.unit_len() {
            return Err(DocumentError::InvalidPosition {
                path: cursor.block.to_string(),
                offset: cursor.offset,
            });
        }
        self.state.cursor = cursor;
        // cursor moves end the typing burst
        self.history.break_group();
        Ok(())
    }

    /// Run an edit against a working copy and commit it only on success.
    ///
    /// The edit receives the document and the cursor and may move the cursor.
    /// A change that leaves the document untouched records nothing.
    pub fn edit<R>(
        &mut self,
        now: Instant,
        f: impl FnOnce(&mut Document, &mut Cursor) -> Result<R, DocumentError>,
    ) -> Result<R, DocumentError> {
        let mut next = self.state.clone();
        let out = f(&mut next.doc, &mut next.cursor)?;
        if next.doc != self.state.doc {
            let before = std::mem::replace(&mut self.state, next);
            self.history.record(before, now);
        } else {
            self.state.cursor = next.cursor;
        }
        Ok(out)
    }

    pub fn insert_text(&mut self, text: &str, now: Instant) -> Result<(), DocumentError> {
        self.edit(now, |doc, cursor| {
            *cursor = doc.insert_text(cursor, text)?;
            Ok(())
        })
    }

    pub fn insert_inline(&mut self, inline: Inline, now: Instant) -> Result<(), DocumentError> {
        self.edit(now, |doc, cursor| {
            *cursor = doc.insert_inline(cursor, inline)?;
            Ok(())
        })
    }

    /// Enter: split the current block.
    pub fn split_block(&mut self, now: Instant) -> Result<(), DocumentError> {
        self.edit(now, |doc, cursor| {
            *cursor = doc.split_block(cursor)?;
            Ok(())
        })
    }

    /// Delete `len` units before the cursor.
    pub fn delete_backward(&mut self, len: usize, now: Instant) -> Result<(), DocumentError> {
        self.edit(now, |doc, cursor| {
            let start = cursor.offset.saturating_sub(len);
            let at = Cursor::new(cursor.block.clone(), start);
            doc.delete_range(&at, cursor.offset - start)?;
            *cursor = at;
            Ok(())
        })
    }

    /// Swap in a whole document as one standalone undo frame.
    pub fn replace_document(&mut self, doc: Document) {
        let next = BodyState::at_end(doc);
        if next.doc == self.state.doc {
            return;
        }
        let before = std::mem::replace(&mut self.state, next);
        self.history.checkpoint(before);
    }

    /// Update link cards outside of history.
    ///
    /// Metadata arriving later is not an edit: it is applied to the live
    /// document and to every stored frame, so undo never resurrects a card
    /// in its loading state.
    pub fn update_link_cards(&mut self, url: &str, mut f: impl FnMut(&mut LinkCardAttrs)) -> usize {
        let hits = self.state.doc.update_link_cards(url, &mut f);
        self.history
            .for_each_frame_mut(|frame| {
                frame.doc.update_link_cards(url, &mut f);
            });
        hits
    }

    pub fn history_depth(&self) -> usize {
        self.history.undo_depth()
    }
}

impl UndoManager for BodyEditor {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        match self.history.undo(&self.state) {
            Some(frame) => {
                self.state = frame;
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.history.redo(&self.state) {
            Some(frame) => {
                self.state = frame;
                true
            }
            None => false,
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// The title input with burst-coalesced history.
#[derive(Clone, Debug)]
pub struct TitleField {
    text: String,
    max_chars: usize,
    history: BurstHistory<String>,
}

impl Default for TitleField {
    fn default() -> Self {
        Self::new(String::new(), 200, DEFAULT_GROUP_DELAY)
    }
}

impl TitleField {
    pub fn new(text: String, max_chars: usize, debounce: Duration) -> Self {
        let mut field = Self {
            text: String::new(),
            max_chars,
            history: BurstHistory::new(DEFAULT_DEPTH, debounce),
        };
        field.text = field.clamp(text);
        field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn clamp(&self, text: String) -> String {
        if text.chars().count() > self.max_chars {
            text.chars().take(self.max_chars).collect()
        } else {
            text
        }
    }

    /// Apply a keystroke-level change. Returns whether the text changed.
    pub fn set(&mut self, text: impl Into<String>, now: Instant) -> bool {
        let text = self.clamp(text.into());
        if text == self.text {
            return false;
        }
        let before = std::mem::replace(&mut self.text, text);
        self.history.record(before, now);
        true
    }

    /// Leaving the input snapshots the title if it changed since the last frame.
    pub fn blur(&mut self) {
        self.history.checkpoint_if_changed(self.text.clone());
    }

    /// Swap the whole title as one standalone undo frame.
    pub fn replace(&mut self, text: impl Into<String>) {
        let text = self.clamp(text.into());
        if text == self.text {
            return;
        }
        let before = std::mem::replace(&mut self.text, text);
        self.history.checkpoint(before);
    }
}

impl UndoManager for TitleField {
    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn undo(&mut self) -> bool {
        match self.history.undo(&self.text) {
            Some(previous) => {
                self.text = previous;
                true
            }
            None => false,
        }
    }

    fn redo(&mut self) -> bool {
        match self.history.redo(&self.text) {
            Some(next) => {
                self.text = next;
                true
            }
            None => false,
        }
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, BlockPath};

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_title_edits_past_debounce_undo_one_by_one() {
        let base = Instant::now();
        let mut title = TitleField::default();
        let steps = ["H", "He", "Hel", "Hell", "Hello"];
        for (i, step) in steps.iter().enumerate() {
            title.set(*step, at(base, i as u64 * 400));
        }
        for _ in 0..steps.len() {
            assert!(title.undo());
        }
        assert_eq!(title.text(), "");
        assert!(!title.undo());
        assert!(title.redo());
        assert_eq!(title.text(), "H");
    }

    #[test]
    fn test_title_burst_is_one_step() {
        let base = Instant::now();
        let mut title = TitleField::default();
        for (i, step) in ["a", "ab", "abc"].iter().enumerate() {
            title.set(*step, at(base, i as u64 * 50));
        }
        assert!(title.undo());
        assert_eq!(title.text(), "");
    }

    #[test]
    fn test_title_blur_then_undo_skips_duplicate() {
        let base = Instant::now();
        let mut title = TitleField::default();
        title.set("draft", at(base, 0));
        title.blur();
        assert!(title.undo());
        assert_eq!(title.text(), "");
    }

    #[test]
    fn test_title_is_clamped() {
        let mut title = TitleField::new(String::new(), 3, DEFAULT_GROUP_DELAY);
        title.set("abcdef", Instant::now());
        assert_eq!(title.text(), "abc");
    }

    #[test]
    fn test_body_typing_groups_and_undoes() {
        let base = Instant::now();
        let mut body = BodyEditor::default();
        body.insert_text("Hel", at(base, 0)).unwrap();
        body.insert_text("lo", at(base, 100)).unwrap();
        body.split_block(at(base, 1000)).unwrap();
        body.insert_text("world", at(base, 1100)).unwrap();
        assert_eq!(body.document().blocks().len(), 2);

        assert!(body.undo());
        assert_eq!(
            body.document().blocks(),
            &[Block::paragraph(vec![Inline::text("Hello")])]
        );
        assert!(body.undo());
        assert!(body.document().is_empty());
        assert!(!body.undo());
        assert!(body.redo());
        assert_eq!(body.cursor(), &crate::document::Cursor::new(BlockPath::top(0), 5));
    }

    #[test]
    fn test_failed_edit_leaves_state_untouched() {
        let mut body = BodyEditor::default();
        let err = body.edit(Instant::now(), |doc, _| {
            doc.insert_text(&Cursor::new(BlockPath::top(0), 0), "x")?;
            doc.insert_text(&Cursor::new(BlockPath::top(5), 0), "y")
        });
        assert!(err.is_err());
        assert!(body.document().is_empty());
        assert!(!body.can_undo());
    }

    #[test]
    fn test_link_card_update_reaches_history() {
        let base = Instant::now();
        let mut body = BodyEditor::default();
        body.edit(at(base, 0), |doc, cursor| {
            *cursor = doc.replace_block_with_atom(
                &cursor.block,
                Block::link_card(LinkCardAttrs::loading("https://example.com")),
            )?;
            Ok(())
        })
        .unwrap();
        body.insert_text("after", at(base, 1000)).unwrap();
        body.update_link_cards("https://example.com", |card| {
            card.status = crate::types::LinkCardStatus::Error;
        });
        assert!(body.undo());
        assert_eq!(
            body.document().link_cards()[0].status,
            crate::types::LinkCardStatus::Error
        );
    }
}
