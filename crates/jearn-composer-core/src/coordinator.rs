//! Undo/redo coordination across the title and the body.
//!
//! The coordinator owns both fields and routes undo/redo by an explicit
//! [`FocusArea`] rather than by whichever element happens to hold focus.
//! It runs in one of two modes:
//!
//! - **Normal**: undo/redo go to the title history or the body history,
//!   whichever area the user last worked in.
//! - **ClearLocked**: entered by [`ComposerState::clear`]. Undo/redo only
//!   swap between the pre-clear snapshot and the wiped state, always both
//!   fields at once. Only a normal edit leaves the mode; focusing a field
//!   does not.

use std::time::Duration;

use web_time::Instant;

use crate::document::Document;
use crate::editor::{BodyEditor, TitleField};
use crate::history::{DEFAULT_DEPTH, DEFAULT_GROUP_DELAY, UndoManager};

/// Which field undo/redo is routed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FocusArea {
    Title,
    Body,
    #[default]
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinatorMode {
    #[default]
    Normal,
    ClearLocked,
}

impl CoordinatorMode {
    pub fn is_clear_locked(&self) -> bool {
        matches!(self, CoordinatorMode::ClearLocked)
    }
}

/// Which fields an undo/redo changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndoOutcome {
    Nothing,
    Title,
    Body,
    Both,
}

impl UndoOutcome {
    pub fn changed_title(&self) -> bool {
        matches!(self, UndoOutcome::Title | UndoOutcome::Both)
    }

    pub fn changed_body(&self) -> bool {
        matches!(self, UndoOutcome::Body | UndoOutcome::Both)
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, UndoOutcome::Nothing)
    }
}

/// History action requested by a keyboard shortcut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
}

impl Shortcut {
    /// Map a key event. `primary` is Ctrl on most platforms and Cmd on macOS.
    pub fn from_key(key: &str, primary: bool, shift: bool) -> Option<Self> {
        if !primary {
            return None;
        }
        match (key.to_ascii_lowercase().as_str(), shift) {
            ("z", false) => Some(Shortcut::Undo),
            ("z", true) | ("y", false) => Some(Shortcut::Redo),
            _ => None,
        }
    }
}

/// Title and body captured together by the clear action.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ClearFrame {
    title: String,
    body: Document,
}

/// Tunables for the two histories.
#[derive(Clone, Copy, Debug)]
pub struct HistoryConfig {
    pub title_debounce: Duration,
    pub body_group_delay: Duration,
    pub body_depth: usize,
    pub max_title_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            title_debounce: DEFAULT_GROUP_DELAY,
            body_group_delay: DEFAULT_GROUP_DELAY,
            body_depth: DEFAULT_DEPTH,
            max_title_chars: 200,
        }
    }
}

/// Live state of one composer: both fields plus the coordinator.
#[derive(Clone, Debug)]
pub struct ComposerState {
    title: TitleField,
    body: BodyEditor,
    focus: FocusArea,
    mode: CoordinatorMode,
    clear_undo: Option<ClearFrame>,
    clear_redo: Option<ClearFrame>,
    config: HistoryConfig,
}

impl Default for ComposerState {
    fn default() -> Self {
        Self::new(String::new(), Document::new(), HistoryConfig::default())
    }
}

impl ComposerState {
    pub fn new(title: String, body: Document, config: HistoryConfig) -> Self {
        Self {
            title: TitleField::new(title, config.max_title_chars, config.title_debounce),
            body: BodyEditor::with_history(body, config.body_depth, config.body_group_delay),
            focus: FocusArea::None,
            mode: CoordinatorMode::Normal,
            clear_undo: None,
            clear_redo: None,
            config,
        }
    }

    pub fn title(&self) -> &str {
        self.title.text()
    }

    pub fn body(&self) -> &BodyEditor {
        &self.body
    }

    pub fn document(&self) -> &Document {
        self.body.document()
    }

    pub fn focus(&self) -> FocusArea {
        self.focus
    }

    pub fn mode(&self) -> CoordinatorMode {
        self.mode
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn exit_clear_lock(&mut self) {
        if self.mode.is_clear_locked() {
            tracing::debug!("leaving clear-locked mode");
            self.mode = CoordinatorMode::Normal;
            self.clear_undo = None;
            self.clear_redo = None;
        }
    }

    /// Meaningful interaction with a field. Clear-locked mode survives it;
    /// undo keeps restoring both fields until the next edit.
    pub fn set_focus(&mut self, area: FocusArea) {
        self.focus = area;
    }

    /// Transient focus loss, e.g. clicking a toolbar button. The remembered
    /// focus area is kept; a title blur snapshots the title.
    pub fn blur(&mut self) {
        if self.focus == FocusArea::Title {
            self.title.blur();
        }
    }

    /// Keystroke-level title change.
    pub fn edit_title(&mut self, text: impl Into<String>, now: Instant) -> bool {
        self.exit_clear_lock();
        self.focus = FocusArea::Title;
        self.title.set(text, now)
    }

    /// Mutable access to the body for a normal edit.
    pub fn body_mut(&mut self) -> &mut BodyEditor {
        self.exit_clear_lock();
        self.focus = FocusArea::Body;
        &mut self.body
    }

    /// Body access that is not a user edit (metadata arriving, previews).
    pub fn body_mut_silent(&mut self) -> &mut BodyEditor {
        &mut self.body
    }

    /// Wipe both fields as one undoable step and enter clear-locked mode.
    pub fn clear(&mut self) {
        let frame = ClearFrame {
            title: self.title.text().to_string(),
            body: self.body.document().clone(),
        };
        // only the latest clear can be undone
        self.clear_undo = Some(frame);
        self.clear_redo = None;
        self.title.replace(String::new());
        self.body.replace_document(Document::new());
        self.mode = CoordinatorMode::ClearLocked;
        self.focus = FocusArea::None;
        tracing::debug!("composer cleared");
    }

    fn apply_clear_frame(&mut self, frame: ClearFrame) {
        self.title.replace(frame.title);
        self.body.replace_document(frame.body);
    }

    fn current_frame(&self) -> ClearFrame {
        ClearFrame {
            title: self.title.text().to_string(),
            body: self.body.document().clone(),
        }
    }

    pub fn undo(&mut self) -> UndoOutcome {
        if self.mode.is_clear_locked() {
            let Some(frame) = self.clear_undo.take() else {
                return UndoOutcome::Nothing;
            };
            self.clear_redo = Some(self.current_frame());
            self.apply_clear_frame(frame);
            return UndoOutcome::Both;
        }
        match self.focus {
            FocusArea::Title if self.title.undo() => UndoOutcome::Title,
            FocusArea::Body if self.body.undo() => UndoOutcome::Body,
            _ => UndoOutcome::Nothing,
        }
    }

    pub fn redo(&mut self) -> UndoOutcome {
        if self.mode.is_clear_locked() {
            let Some(frame) = self.clear_redo.take() else {
                return UndoOutcome::Nothing;
            };
            self.clear_undo = Some(self.current_frame());
            self.apply_clear_frame(frame);
            return UndoOutcome::Both;
        }
        match self.focus {
            FocusArea::Title if self.title.redo() => UndoOutcome::Title,
            FocusArea::Body if self.body.redo() => UndoOutcome::Body,
            _ => UndoOutcome::Nothing,
        }
    }

    pub fn shortcut(&mut self, shortcut: Shortcut) -> UndoOutcome {
        match shortcut {
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
        }
    }

    pub fn can_undo(&self) -> bool {
        match (self.mode, self.focus) {
            (CoordinatorMode::ClearLocked, _) => self.clear_undo.is_some(),
            (_, FocusArea::Title) => self.title.can_undo(),
            (_, FocusArea::Body) => self.body.can_undo(),
            (_, FocusArea::None) => false,
        }
    }

    pub fn can_redo(&self) -> bool {
        match (self.mode, self.focus) {
            (CoordinatorMode::ClearLocked, _) => self.clear_redo.is_some(),
            (_, FocusArea::Title) => self.title.can_redo(),
            (_, FocusArea::Body) => self.body.can_redo(),
            (_, FocusArea::None) => false,
        }
    }

    /// True when both fields are empty.
    pub fn is_empty(&self) -> bool {
        self.title.text().trim().is_empty() && self.body.document().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Inline};
    use pretty_assertions::assert_eq;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn filled() -> ComposerState {
        let base = Instant::now();
        let mut state = ComposerState::default();
        state.edit_title("My title", at(base, 0));
        state
            .body_mut()
            .insert_text("Body text", at(base, 10))
            .unwrap();
        state
    }

    #[test]
    fn test_clear_undo_restores_both_then_redo_wipes() {
        let mut state = filled();
        let body_before = state.document().clone();

        state.clear();
        assert_eq!(state.mode(), CoordinatorMode::ClearLocked);
        assert!(state.is_empty());

        assert_eq!(state.undo(), UndoOutcome::Both);
        assert_eq!(state.title(), "My title");
        assert_eq!(state.document(), &body_before);

        assert_eq!(state.redo(), UndoOutcome::Both);
        assert!(state.is_empty());

        assert_eq!(state.undo(), UndoOutcome::Both);
        assert_eq!(state.title(), "My title");
    }

    #[test]
    fn test_clear_of_empty_composer_still_locks() {
        let mut state = ComposerState::default();
        state.clear();
        assert!(state.mode().is_clear_locked());
        assert_eq!(state.undo(), UndoOutcome::Both);
        assert!(state.is_empty());
    }

    #[test]
    fn test_normal_edit_exits_clear_lock() {
        let mut state = filled();
        state.clear();
        state.undo();
        state.edit_title("again", Instant::now());
        assert_eq!(state.mode(), CoordinatorMode::Normal);
        assert_eq!(state.focus(), FocusArea::Title);
    }

    #[test]
    fn test_routing_follows_focus_and_survives_blur() {
        let base = Instant::now();
        let mut state = ComposerState::default();
        state.edit_title("T", at(base, 0));
        state.body_mut().insert_text("B", at(base, 1000)).unwrap();

        // toolbar click: focus is kept on the body
        state.blur();
        assert_eq!(state.shortcut(Shortcut::Undo), UndoOutcome::Body);
        assert_eq!(state.title(), "T");
        assert!(state.document().is_empty());

        state.set_focus(FocusArea::Title);
        assert_eq!(state.shortcut(Shortcut::Undo), UndoOutcome::Title);
        assert_eq!(state.title(), "");
    }

    #[test]
    fn test_no_focus_and_empty_stacks_are_noops() {
        let mut state = ComposerState::default();
        assert_eq!(state.undo(), UndoOutcome::Nothing);
        assert_eq!(state.redo(), UndoOutcome::Nothing);
        state.set_focus(FocusArea::Body);
        assert_eq!(state.undo(), UndoOutcome::Nothing);
    }

    #[test]
    fn test_shortcut_mapping() {
        assert_eq!(Shortcut::from_key("z", true, false), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_key("Z", true, true), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key("y", true, false), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key("z", false, false), None);
    }

    #[test]
    fn test_focus_alone_keeps_clear_lock() {
        let mut state = filled();
        let body_before = state.document().clone();
        state.clear();
        state.set_focus(FocusArea::Title);
        assert!(state.mode().is_clear_locked());

        assert_eq!(state.undo(), UndoOutcome::Both);
        assert_eq!(state.title(), "My title");
        assert_eq!(state.document(), &body_before);
    }

    #[test]
    fn test_only_latest_clear_is_undoable() {
        let base = Instant::now();
        let mut state = ComposerState::default();
        state.edit_title("A", at(base, 0));
        state.clear();
        state.edit_title("C", at(base, 1000));
        assert_eq!(state.mode(), CoordinatorMode::Normal);
        state.clear();

        assert_eq!(state.undo(), UndoOutcome::Both);
        assert_eq!(state.title(), "C");
        assert_eq!(state.undo(), UndoOutcome::Nothing);
        assert_eq!(state.title(), "C");
        assert!(!state.can_undo());
    }

    #[test]
    fn test_leaving_lock_keeps_field_history() {
        let base = Instant::now();
        let mut state = filled();
        state.clear();
        state
            .body_mut()
            .insert_text("New", at(base, 5000))
            .unwrap();
        assert_eq!(state.mode(), CoordinatorMode::Normal);
        // body undo walks the body history: the new text, then the wipe
        assert_eq!(state.undo(), UndoOutcome::Body);
        assert!(state.document().is_empty());
        assert_eq!(state.undo(), UndoOutcome::Body);
        assert_eq!(
            state.document().blocks(),
            &[Block::paragraph(vec![Inline::text("Body text")])]
        );
    }
}
