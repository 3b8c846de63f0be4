use uuid::Uuid;

use super::*;
use crate::stroke::Stroke;

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Brush
// =============================================================

#[test]
fn default_brush_is_thin_black() {
    let b = Brush::default();
    assert_eq!(b.ink(), Ink::color("#000000"));
    assert!((b.stroke_width() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn eraser_brush_doubles_width() {
    let b = Brush { color: "#ff0000".into(), width: 5.0, eraser: true };
    assert_eq!(b.ink(), Ink::Eraser);
    assert!((b.stroke_width() - 10.0).abs() < f64::EPSILON);
}

// =============================================================
// DrawingSession
// =============================================================

#[test]
fn extend_without_begin_is_ignored() {
    let mut s = DrawingSession::new();
    let mut r = Raster::new(10, 10);
    assert!(!s.extend(p(1.0, 1.0), &mut r));
    assert!(s.points().is_empty());
    assert!(r.image().pixels().all(|px| px.0[3] == 0));
}

#[test]
fn begin_extend_commit_produces_draft() {
    let mut s = DrawingSession::new();
    let mut r = Raster::new(20, 20);
    s.begin(&Brush::default(), p(0.0, 0.0));
    assert!(s.is_active());
    assert!(s.extend(p(5.0, 5.0), &mut r));
    assert!(s.extend(p(10.0, 10.0), &mut r));
    let draft = s.commit().unwrap();
    assert_eq!(draft.points, vec![p(0.0, 0.0), p(5.0, 5.0), p(10.0, 10.0)]);
    assert_eq!(draft.color, Ink::color("#000000"));
    assert!(!s.is_active());
}

#[test]
fn single_point_commit_is_discarded() {
    let mut s = DrawingSession::new();
    s.begin(&Brush::default(), p(3.0, 3.0));
    assert_eq!(s.commit(), None);
    assert!(!s.is_active());
    assert_eq!(s.commit(), None);
}

#[test]
fn cancel_discards_path() {
    let mut s = DrawingSession::new();
    let mut r = Raster::new(10, 10);
    s.begin(&Brush::default(), p(0.0, 0.0));
    s.extend(p(4.0, 4.0), &mut r);
    assert!(s.cancel());
    assert!(!s.cancel());
    assert_eq!(s.commit(), None);
}

#[test]
fn brush_is_captured_at_begin() {
    let mut s = DrawingSession::new();
    let mut r = Raster::new(10, 10);
    let mut brush = Brush::default();
    s.begin(&brush, p(0.0, 0.0));
    brush.eraser = true;
    s.extend(p(5.0, 5.0), &mut r);
    let draft = s.commit().unwrap();
    assert_eq!(draft.color, Ink::color("#000000"));
}

#[test]
fn optimistic_pixels_match_committed_replay() {
    let brush = Brush { color: "#3366cc".into(), width: 3.0, eraser: false };
    let points = [p(1.0, 1.0), p(12.0, 4.0), p(6.0, 14.0), p(15.0, 15.0)];

    let mut live = Raster::new(20, 20);
    let mut s = DrawingSession::new();
    s.begin(&brush, points[0]);
    for &pt in &points[1..] {
        s.extend(pt, &mut live);
    }
    let draft = s.commit().unwrap();

    let mut replay = Raster::new(20, 20);
    replay.render(&[Stroke::commit(draft, Uuid::nil(), "u", 1, 0)]);
    assert_eq!(live.image().as_raw(), replay.image().as_raw());
}

#[test]
fn eraser_session_erases_while_drawing() {
    let mut r = Raster::new(20, 20);
    r.draw_segment(p(0.0, 10.0), p(20.0, 10.0), &Ink::color("#000"), 4.0);
    let brush = Brush { color: "#000".into(), width: 4.0, eraser: true };
    let mut s = DrawingSession::new();
    s.begin(&brush, p(0.0, 10.0));
    s.extend(p(20.0, 10.0), &mut r);
    assert_eq!(r.pixel(10, 10), Some([0, 0, 0, 0]));
    let draft = s.commit().unwrap();
    assert_eq!(draft.color, Ink::Eraser);
    assert!((draft.width - 8.0).abs() < f64::EPSILON);
}

#[test]
fn redraw_restores_open_path_after_rerender() {
    let brush = Brush { color: "#ff0000".into(), width: 2.0, eraser: false };
    let mut live = Raster::new(20, 20);
    let mut s = DrawingSession::new();
    s.begin(&brush, p(2.0, 10.0));
    s.extend(p(18.0, 10.0), &mut live);
    let before = live.image().as_raw().clone();

    live.render(&[]);
    assert_eq!(live.pixel(10, 10), Some([0, 0, 0, 0]));
    s.redraw(&mut live);
    assert_eq!(live.image().as_raw(), &before);
}

#[test]
fn redraw_of_single_point_paints_nothing() {
    let mut r = Raster::new(10, 10);
    let mut s = DrawingSession::new();
    s.begin(&Brush::default(), p(5.0, 5.0));
    s.redraw(&mut r);
    assert_eq!(r.pixel(5, 5), Some([0, 0, 0, 0]));
}
