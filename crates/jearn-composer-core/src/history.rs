//! Undo/redo history for the composer fields.
//!
//! Provides:
//! - `UndoManager` trait for abstracting undo implementations
//! - `BurstHistory<T>` - snapshot stacks with time-windowed coalescing

use std::time::Duration;

use web_time::Instant;

/// Default coalescing window for both title and body edits.
pub const DEFAULT_GROUP_DELAY: Duration = Duration::from_millis(300);

/// Default number of undo frames kept per field.
pub const DEFAULT_DEPTH: usize = 200;

/// Trait for managing undo/redo operations.
///
/// Implementations must actually perform the undo/redo, not just track state.
pub trait UndoManager {
    /// Check if undo is available.
    fn can_undo(&self) -> bool;

    /// Check if redo is available.
    fn can_redo(&self) -> bool;

    /// Perform undo. Returns true if the content changed.
    fn undo(&mut self) -> bool;

    /// Perform redo. Returns true if the content changed.
    fn redo(&mut self) -> bool;

    /// Clear all undo/redo history.
    fn clear_history(&mut self);
}

/// Snapshot history that folds rapid edits into one frame.
///
/// Callers hand in the state as it was *before* each edit together with the
/// edit time. A new frame is only pushed when more than `group_delay` has
/// passed since the previous edit, so a burst of typing undoes in one step.
#[derive(Clone, Debug)]
pub struct BurstHistory<T> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
    max_steps: usize,
    group_delay: Duration,
    last_edit: Option<Instant>,
}

impl<T: Clone + PartialEq> Default for BurstHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH, DEFAULT_GROUP_DELAY)
    }
}

impl<T: Clone + PartialEq> BurstHistory<T> {
    pub fn new(max_steps: usize, group_delay: Duration) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps: max_steps.max(1),
            group_delay,
            last_edit: None,
        }
    }

    /// Record an edit made at `now`; `before` is the state it replaced.
    pub fn record(&mut self, before: T, now: Instant) {
        self.redo_stack.clear();
        let coalesce = match self.last_edit {
            Some(prev) => now.saturating_duration_since(prev) <= self.group_delay,
            None => false,
        };
        self.last_edit = Some(now);
        if coalesce && !self.undo_stack.is_empty() {
            return;
        }
        self.push_frame(before);
    }

    /// Push a frame regardless of timing and close the current group.
    pub fn checkpoint(&mut self, before: T) {
        self.redo_stack.clear();
        self.push_frame(before);
        self.last_edit = None;
    }

    /// Push `state` unless it already is the newest frame.
    pub fn checkpoint_if_changed(&mut self, state: T) {
        if self.undo_stack.last() != Some(&state) {
            self.checkpoint(state);
        }
    }

    /// End the current coalescing group so the next edit opens a new frame.
    pub fn break_group(&mut self) {
        self.last_edit = None;
    }

    fn push_frame(&mut self, frame: T) {
        self.undo_stack.push(frame);

        // Trim if over max
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the newest frame that differs from `current`.
    ///
    /// Frames equal to `current` carry no change and are discarded on the
    /// way. On success `current` moves onto the redo stack.
    pub fn undo(&mut self, current: &T) -> Option<T> {
        while let Some(frame) = self.undo_stack.pop() {
            if frame != *current {
                self.redo_stack.push(current.clone());
                self.last_edit = None;
                return Some(frame);
            }
        }
        None
    }

    pub fn redo(&mut self, current: &T) -> Option<T> {
        let frame = self.redo_stack.pop()?;
        self.undo_stack.push(current.clone());
        self.last_edit = None;
        Some(frame)
    }

    /// Patch every stored frame in place without affecting grouping.
    pub fn for_each_frame_mut(&mut self, mut f: impl FnMut(&mut T)) {
        self.undo_stack.iter_mut().for_each(&mut f);
        self.redo_stack.iter_mut().for_each(&mut f);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.last_edit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_burst_coalesces_into_one_frame() {
        let base = Instant::now();
        let mut h: BurstHistory<String> = BurstHistory::default();
        h.record("".into(), at(base, 0));
        h.record("a".into(), at(base, 100));
        h.record("ab".into(), at(base, 250));
        assert_eq!(h.undo_depth(), 1);

        // gap measured from the previous edit, not the first
        h.record("abc".into(), at(base, 560));
        assert_eq!(h.undo_depth(), 2);
    }

    #[test]
    fn test_undo_skips_frames_equal_to_current() {
        let mut h: BurstHistory<String> = BurstHistory::default();
        h.checkpoint("x".into());
        h.checkpoint("y".into());
        h.checkpoint("y".into());
        assert_eq!(h.undo(&"y".to_string()), Some("x".to_string()));
        assert!(!h.can_undo());
        assert_eq!(h.redo(&"x".to_string()), Some("y".to_string()));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let base = Instant::now();
        let mut h: BurstHistory<u32> = BurstHistory::default();
        h.record(0, at(base, 0));
        assert_eq!(h.undo(&1), Some(0));
        assert!(h.can_redo());
        h.record(0, at(base, 1000));
        assert!(!h.can_redo());
    }

    #[test]
    fn test_depth_trims_oldest() {
        let mut h: BurstHistory<u32> = BurstHistory::new(3, DEFAULT_GROUP_DELAY);
        for i in 0..5 {
            h.checkpoint(i);
        }
        assert_eq!(h.undo_depth(), 3);
        assert_eq!(h.undo(&9), Some(4));
        assert_eq!(h.undo(&4), Some(3));
        assert_eq!(h.undo(&3), Some(2));
        assert_eq!(h.undo(&2), None);
    }

    #[test]
    fn test_empty_stack_is_noop() {
        let mut h: BurstHistory<u32> = BurstHistory::default();
        assert_eq!(h.undo(&0), None);
        assert_eq!(h.redo(&0), None);
    }
}
