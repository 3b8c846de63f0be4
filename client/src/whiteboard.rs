//! Whiteboard engine: one participant's view of one room.
//!
//! DESIGN
//! ======
//! The engine is owned by a single task. Drawing is optimistic: every
//! pointer sample lands on the raster before anything is sent, and a commit
//! never waits on the network to show its pixels.
//!
//! Two tiers of stroke state are kept:
//! - the mirror: the last authoritative listing plus strokes this client
//!   committed that the listing does not show yet
//! - the history: the displayed sequence with local undo/redo snapshots
//!
//! Room events are hints and always lead to a re-fetch, never to trusting
//! the event body. `stroke:added` for a stroke the mirror already holds is
//! ignored; any other one re-lists the room and appends only the strokes
//! that are new since the last listing, so a local undo survives other
//! participants drawing. `stroke:cleared` discards the undo stacks and
//! resyncs; a late or repeated one therefore cannot hide strokes the log
//! still holds.
//!
//! Undo and redo only change the local view. The log is never rewritten, so
//! an explicit resync shows the authoritative sequence again, and restoring
//! a snapshot can hide strokes other participants committed meanwhile.

use std::sync::Arc;

use canvas::history::History;
use canvas::mirror::StrokeMirror;
use canvas::presence::{CanvasRect, Cursor, CursorThrottle};
use canvas::render::{ExportFormat, Raster, RenderError};
use canvas::session::{Brush, DrawingSession};
use canvas::{Point, Stroke};
use frames::RoomEvent;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::SyncError;
use crate::log::{PresenceLog, StrokeLog, Subscription};
use crate::presence::PresenceBroadcaster;

pub struct Whiteboard {
    room_id: Uuid,
    user_id: String,
    user_name: String,
    throttle: CursorThrottle,
    log: Arc<dyn StrokeLog>,
    presence: Arc<dyn PresenceLog>,
    raster: Raster,
    brush: Brush,
    session: DrawingSession,
    history: History,
    mirror: StrokeMirror,
    subscription: Option<Subscription>,
    broadcaster: Option<PresenceBroadcaster>,
    cursors: Vec<Cursor>,
}

impl Whiteboard {
    #[must_use]
    pub fn new(
        room_id: Uuid,
        user_id: &str,
        user_name: &str,
        config: &ClientConfig,
        log: Arc<dyn StrokeLog>,
        presence: Arc<dyn PresenceLog>,
    ) -> Self {
        Self {
            room_id,
            user_id: user_id.to_owned(),
            user_name: user_name.to_owned(),
            throttle: CursorThrottle::new(config.cursor_throttle, config.cursor_debounce),
            log,
            presence,
            raster: Raster::new(config.canvas_width, config.canvas_height),
            brush: config.brush.clone(),
            session: DrawingSession::new(),
            history: History::new(),
            mirror: StrokeMirror::new(),
            subscription: None,
            broadcaster: None,
            cursors: Vec::new(),
        }
    }

    #[must_use]
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// The displayed stroke sequence.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        self.history.current()
    }

    #[must_use]
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Change the tool for the next stroke. An open path keeps its brush.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // =========================================================================
    // DRAWING
    // =========================================================================

    /// Pointer down: open a path with the current brush.
    pub fn begin_stroke(&mut self, point: Point) {
        self.session.begin(&self.brush, point);
    }

    /// Pointer sample: append and paint it. Ignored with no open path.
    pub fn extend_stroke(&mut self, point: Point) -> bool {
        self.session.extend(point, &mut self.raster)
    }

    /// Pointer capture lost: drop the path and repaint the committed view.
    pub fn cancel_stroke(&mut self) -> bool {
        let cancelled = self.session.cancel();
        if cancelled {
            self.repaint();
        }
        cancelled
    }

    /// Pointer up: submit the open path to the log.
    ///
    /// Returns `Ok(None)` when there was nothing committable (no path, fewer
    /// than two points, or an invalid brush); nothing is sent in that case.
    ///
    /// # Errors
    ///
    /// The log's error. Local state is left as it was; the optimistic pixels
    /// stay until the next repaint or resync.
    pub async fn commit_stroke(&mut self) -> Result<Option<Stroke>, SyncError> {
        let Some(draft) = self.session.commit() else {
            return Ok(None);
        };
        if let Err(e) = draft.validate() {
            debug!(room_id = %self.room_id, error = %e, "whiteboard: dropped malformed stroke");
            self.repaint();
            return Ok(None);
        }

        let stroke = match self.log.append(self.room_id, &draft).await {
            Ok(stroke) => stroke,
            Err(e) => {
                warn!(room_id = %self.room_id, error = %e, "whiteboard: append failed");
                return Err(e);
            }
        };

        self.mirror.push_pending(stroke.clone());
        self.history.commit(stroke.clone());
        self.repaint();
        Ok(Some(stroke))
    }

    /// Delete every stroke in the room. Not undoable.
    ///
    /// # Errors
    ///
    /// The log's error; nothing local changes in that case.
    pub async fn clear_room(&mut self) -> Result<(), SyncError> {
        if let Err(e) = self.log.clear(self.room_id).await {
            warn!(room_id = %self.room_id, error = %e, "whiteboard: clear failed");
            return Err(e);
        }
        self.apply_cleared();
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo();
        if changed {
            self.repaint();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo();
        if changed {
            self.repaint();
        }
        changed
    }

    /// Encode the current raster.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error.
    pub fn export_raster(&self, format: ExportFormat) -> Result<Vec<u8>, RenderError> {
        self.raster.encode(format)
    }

    // =========================================================================
    // SYNC
    // =========================================================================

    /// Start receiving room events, start presence, and load the room.
    ///
    /// # Errors
    ///
    /// Fails if the subscription or the initial listing fails. A failed
    /// listing keeps the subscription; call [`Whiteboard::resync`] again.
    pub async fn subscribe(&mut self) -> Result<(), SyncError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        self.subscription = Some(self.log.subscribe(self.room_id).await?);
        self.broadcaster = Some(PresenceBroadcaster::spawn(
            Arc::clone(&self.presence),
            self.room_id,
            self.user_name.clone(),
            self.throttle.clone(),
        ));
        info!(room_id = %self.room_id, user_id = %self.user_id, "whiteboard: subscribed");

        self.resync().await?;
        if let Err(e) = self.refresh_cursors().await {
            warn!(room_id = %self.room_id, error = %e, "whiteboard: cursor listing failed");
        }
        Ok(())
    }

    /// Release the subscription and delete this participant's cursor.
    ///
    /// # Errors
    ///
    /// The presence store's error from deleting the cursor. The
    /// subscription is released regardless.
    pub async fn unsubscribe(&mut self) -> Result<(), SyncError> {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!(room_id = %self.room_id, "whiteboard: unsubscribed");
        }
        self.cursors.clear();
        match self.broadcaster.take() {
            Some(broadcaster) => broadcaster.stop().await,
            None => Ok(()),
        }
    }

    /// Replace the authoritative sequence with the log's listing.
    ///
    /// # Errors
    ///
    /// The log's error; the displayed sequence is kept.
    pub async fn resync(&mut self) -> Result<(), SyncError> {
        let strokes = self.fetch_strokes().await?;
        debug!(room_id = %self.room_id, count = strokes.len(), "whiteboard: resynced");
        self.mirror.replace_authoritative(strokes);
        self.history.replace_current(self.mirror.display());
        self.repaint();
        Ok(())
    }

    /// Re-list the room and append strokes committed since the last listing.
    /// Strokes the local user undid stay hidden.
    async fn merge_new_strokes(&mut self) -> Result<(), SyncError> {
        let strokes = self.fetch_strokes().await?;
        let last = self.mirror.last_seq();
        let fresh: Vec<Stroke> =
            strokes.iter().filter(|s| s.seq > last && !self.mirror.contains(s.id)).cloned().collect();
        debug!(room_id = %self.room_id, fresh = fresh.len(), "whiteboard: merged remote strokes");
        self.mirror.replace_authoritative(strokes);
        self.history.extend_current(fresh);
        self.repaint();
        Ok(())
    }

    async fn fetch_strokes(&self) -> Result<Vec<Stroke>, SyncError> {
        self.log.list(self.room_id).await.inspect_err(|e| {
            warn!(room_id = %self.room_id, error = %e, "whiteboard: stroke listing failed");
        })
    }

    /// Wait for the next room event. `None` when not subscribed or the
    /// source has gone away.
    pub async fn next_event(&mut self) -> Option<RoomEvent> {
        self.subscription.as_mut()?.recv().await
    }

    /// React to one room event. Safe to call repeatedly with the same event.
    ///
    /// # Errors
    ///
    /// The error of the re-fetch the event triggered, if any.
    pub async fn handle_event(&mut self, event: &RoomEvent) -> Result<(), SyncError> {
        if event.room_id() != self.room_id.to_string() {
            return Ok(());
        }
        match event {
            RoomEvent::StrokeAdded { stroke_id, .. } => {
                let known = Uuid::parse_str(stroke_id).is_ok_and(|id| self.mirror.contains(id));
                if known { Ok(()) } else { self.merge_new_strokes().await }
            }
            RoomEvent::Cleared { .. } => {
                // The listing decides what survived; snapshots may predate the clear.
                self.history.forget_snapshots();
                self.mirror.clear();
                self.resync().await
            }
            RoomEvent::CursorChanged { user_id, .. } => {
                if *user_id == self.user_id { Ok(()) } else { self.refresh_cursors().await }
            }
            RoomEvent::Joined { user_id, .. } | RoomEvent::Parted { user_id, .. } => {
                debug!(room_id = %self.room_id, %user_id, "whiteboard: participant change");
                Ok(())
            }
        }
    }

    // =========================================================================
    // PRESENCE
    // =========================================================================

    /// Pointer moved over the canvas, in client coordinates.
    pub fn pointer_moved(&self, client_x: f64, client_y: f64, canvas: CanvasRect) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.moved(canvas.to_local(client_x, client_y));
        }
    }

    /// Pointer left the canvas: cancel any pending send and delete the cursor.
    ///
    /// # Errors
    ///
    /// The presence store's error.
    pub async fn pointer_left(&mut self) -> Result<(), SyncError> {
        match &self.broadcaster {
            Some(broadcaster) => broadcaster.hide().await,
            None => Ok(()),
        }
    }

    /// Other participants' cursors as of the last refresh.
    #[must_use]
    pub fn remote_cursors(&self) -> &[Cursor] {
        &self.cursors
    }

    async fn refresh_cursors(&mut self) -> Result<(), SyncError> {
        let mut cursors = self.presence.list(self.room_id).await?;
        cursors.retain(|c| c.user_id != self.user_id);
        self.cursors = cursors;
        Ok(())
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn apply_cleared(&mut self) {
        self.mirror.clear();
        self.history.reset(Vec::new());
        self.repaint();
    }

    /// Replay the displayed sequence, then any open path on top.
    fn repaint(&mut self) {
        self.raster.render(self.history.current());
        self.session.redraw(&mut self.raster);
    }
}

#[cfg(test)]
#[path = "whiteboard_test.rs"]
mod tests;
