//! Client-side mirror of a room's stroke log.
//!
//! Two tiers: the authoritative list last fetched from the log, and a
//! pending overlay of strokes this client saw confirmed but that have not yet
//! shown up in a fetched list. The display sequence is authoritative followed
//! by pending. The overlay is recomputed from scratch on every refresh.

#[cfg(test)]
#[path = "mirror_test.rs"]
mod mirror_test;

use uuid::Uuid;

use crate::stroke::{Stroke, canonical_order};

#[derive(Debug, Clone, Default)]
pub struct StrokeMirror {
    authoritative: Vec<Stroke>,
    pending: Vec<Stroke>,
}

impl StrokeMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authoritative(&self) -> &[Stroke] {
        &self.authoritative
    }

    #[must_use]
    pub fn pending(&self) -> &[Stroke] {
        &self.pending
    }

    /// Highest `seq` in the authoritative list, 0 when empty.
    #[must_use]
    pub fn last_seq(&self) -> i64 {
        self.authoritative.last().map_or(0, |s| s.seq)
    }

    /// Whether `id` is known in either tier.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.authoritative.iter().chain(&self.pending).any(|s| s.id == id)
    }

    /// Record a stroke the log confirmed to this client.
    pub fn push_pending(&mut self, stroke: Stroke) {
        if self.contains(stroke.id) {
            return;
        }
        self.pending.push(stroke);
        self.pending.sort_by_key(|s| s.seq);
    }

    /// Adopt a freshly fetched list and rebuild the pending overlay.
    ///
    /// A pending stroke survives only if the list does not contain it and it
    /// committed after the list's last entry. One that is older but absent
    /// was removed from the log.
    pub fn replace_authoritative(&mut self, mut strokes: Vec<Stroke>) {
        canonical_order(&mut strokes);
        self.authoritative = strokes;
        let last = self.last_seq();
        let pending = std::mem::take(&mut self.pending);
        self.pending = pending
            .into_iter()
            .filter(|p| p.seq > last && !self.authoritative.iter().any(|s| s.id == p.id))
            .collect();
    }

    /// Drop both tiers, as after a room clear.
    pub fn clear(&mut self) {
        self.authoritative.clear();
        self.pending.clear();
    }

    /// Sequence to render: authoritative then pending.
    #[must_use]
    pub fn display(&self) -> Vec<Stroke> {
        self.authoritative.iter().chain(&self.pending).cloned().collect()
    }
}
