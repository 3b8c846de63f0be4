use uuid::Uuid;

use super::*;
use crate::stroke::{Ink, Point, StrokeDraft};

fn stroke(seq: i64) -> Stroke {
    let draft = StrokeDraft {
        points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
        color: Ink::color("#000"),
        width: 1.0,
    };
    Stroke::commit(draft, Uuid::nil(), "u", seq, 0)
}

fn ids(h: &History) -> Vec<Uuid> {
    h.current().iter().map(|s| s.id).collect()
}

#[test]
fn empty_history_cannot_undo_or_redo() {
    let mut h = History::new();
    assert!(!h.can_undo());
    assert!(!h.can_redo());
    assert!(!h.undo());
    assert!(!h.redo());
    assert!(h.current().is_empty());
}

#[test]
fn commit_appends_and_snapshots() {
    let mut h = History::new();
    h.commit(stroke(1));
    h.commit(stroke(2));
    assert_eq!(h.current().len(), 2);
    assert_eq!(h.undo_depth(), 2);
    assert_eq!(h.redo_depth(), 0);
}

#[test]
fn undo_n_then_redo_n_restores_sequence() {
    let mut h = History::new();
    for seq in 1..=5 {
        h.commit(stroke(seq));
    }
    let original = ids(&h);
    for _ in 0..5 {
        assert!(h.undo());
    }
    assert!(h.current().is_empty());
    assert!(!h.undo());
    for _ in 0..5 {
        assert!(h.redo());
    }
    assert!(!h.redo());
    assert_eq!(ids(&h), original);
}

#[test]
fn commit_after_undo_drops_redo() {
    let mut h = History::new();
    h.commit(stroke(1));
    h.commit(stroke(2));
    h.undo();
    assert!(h.can_redo());
    h.commit(stroke(3));
    assert!(!h.can_redo());
    assert_eq!(h.current().iter().map(|s| s.seq).collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn remote_refresh_keeps_stacks() {
    let mut h = History::new();
    h.commit(stroke(1));
    let remote = stroke(2);
    let mut merged = h.current().to_vec();
    merged.push(remote);
    h.replace_current(merged);
    assert_eq!(h.current().len(), 2);
    assert_eq!(h.undo_depth(), 1);
    // Stale snapshot: the remote stroke disappears from this view.
    assert!(h.undo());
    assert!(h.current().is_empty());
}

#[test]
fn reset_discards_both_stacks() {
    let mut h = History::new();
    h.commit(stroke(1));
    h.commit(stroke(2));
    h.undo();
    h.reset(Vec::new());
    assert!(h.current().is_empty());
    assert!(!h.undo());
    assert!(!h.redo());
    assert!(h.current().is_empty());
}

#[test]
fn remote_strokes_do_not_bring_back_undone_ones() {
    let mut h = History::new();
    let mine = stroke(1);
    h.commit(mine);
    h.undo();

    let theirs = stroke(2);
    h.extend_current([theirs.clone()]);
    assert_eq!(ids(&h), vec![theirs.id]);
    assert!(h.can_redo());
    assert!(!h.can_undo());
}

#[test]
fn extend_current_keeps_commit_order_and_drops_repeats() {
    let mut h = History::new();
    let (early, late) = (stroke(1), stroke(3));
    h.commit(late.clone());
    h.extend_current([early.clone(), late.clone()]);
    assert_eq!(ids(&h), vec![early.id, late.id]);
    assert_eq!(h.undo_depth(), 1);
}

#[test]
fn forget_snapshots_keeps_current() {
    let mut h = History::new();
    h.commit(stroke(1));
    h.commit(stroke(2));
    h.undo();
    h.forget_snapshots();
    assert_eq!(h.current().len(), 1);
    assert!(!h.can_undo());
    assert!(!h.can_redo());
}
