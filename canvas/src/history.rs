//! Snapshot undo/redo over the room's stroke sequence.
//!
//! Each local commit pushes a full copy of the pre-commit sequence. Strokes
//! from other participants are appended to the current sequence without
//! touching either stack, so undoing may restore a snapshot that predates
//! them. Undo only changes what this client displays; the log is never
//! written and an explicit resync brings the authoritative list back.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::stroke::{Stroke, canonical_order};

#[derive(Debug, Clone, Default)]
pub struct History {
    current: Vec<Stroke>,
    undo_stack: Vec<Vec<Stroke>>,
    redo_stack: Vec<Vec<Stroke>>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence currently displayed.
    #[must_use]
    pub fn current(&self) -> &[Stroke] {
        &self.current
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Record a local commit: snapshot, drop redo, append.
    pub fn commit(&mut self, stroke: Stroke) {
        self.undo_stack.push(self.current.clone());
        self.redo_stack.clear();
        self.current.push(stroke);
    }

    /// Restore the previous snapshot. Returns `false` when there is none.
    pub fn undo(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(std::mem::replace(&mut self.current, prev));
        true
    }

    /// Re-apply the last undone snapshot. Returns `false` when there is none.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(std::mem::replace(&mut self.current, next));
        true
    }

    /// Adopt a sequence fetched from the log. Stacks are kept.
    pub fn replace_current(&mut self, strokes: Vec<Stroke>) {
        self.current = strokes;
    }

    /// Add strokes committed elsewhere to the current sequence, in commit
    /// order. Stacks and locally undone strokes are left alone.
    pub fn extend_current(&mut self, strokes: impl IntoIterator<Item = Stroke>) {
        self.current.extend(strokes);
        canonical_order(&mut self.current);
    }

    /// Drop both stacks and keep the current sequence.
    pub fn forget_snapshots(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Adopt a sequence after the room was cleared. Both stacks are dropped
    /// so no snapshot can bring cleared strokes back.
    pub fn reset(&mut self, strokes: Vec<Stroke>) {
        self.current = strokes;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
