//! Cursor broadcaster: paces pointer samples into presence updates.
//!
//! A spawned task owns a [`CursorThrottle`]. Pointer samples are queued to
//! it without blocking the caller; the task drops samples inside the
//! throttle window and sends the last accepted position once the debounce
//! deadline passes. Hiding cancels any pending send and deletes this
//! participant's cursor row.

use std::sync::Arc;

use canvas::Point;
use canvas::presence::CursorThrottle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::log::PresenceLog;

type Ack = oneshot::Sender<Result<(), SyncError>>;

enum Command {
    Move(Point),
    Hide(Ack),
    Stop(Ack),
}

pub struct PresenceBroadcaster {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl PresenceBroadcaster {
    /// Start broadcasting for `room_id` under `user_name`.
    #[must_use]
    pub fn spawn(log: Arc<dyn PresenceLog>, room_id: Uuid, user_name: String, throttle: CursorThrottle) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, log, room_id, user_name, throttle));
        Self { commands, task }
    }

    /// Offer a canvas-local pointer position.
    pub fn moved(&self, position: Point) {
        if self.commands.send(Command::Move(position)).is_err() {
            debug!("presence: broadcaster stopped, sample dropped");
        }
    }

    /// Cancel any pending send and delete this participant's cursor.
    ///
    /// # Errors
    ///
    /// The presence store's error, or `WsClosed` if the task is gone.
    pub async fn hide(&self) -> Result<(), SyncError> {
        self.call(Command::Hide).await
    }

    /// Hide, then stop the task.
    ///
    /// # Errors
    ///
    /// As for [`PresenceBroadcaster::hide`].
    pub async fn stop(self) -> Result<(), SyncError> {
        self.call(Command::Stop).await
    }

    async fn call(&self, command: impl FnOnce(Ack) -> Command) -> Result<(), SyncError> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(command(tx)).map_err(|_| SyncError::WsClosed)?;
        rx.await.map_err(|_| SyncError::WsClosed)?
    }
}

impl Drop for PresenceBroadcaster {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut commands: mpsc::UnboundedReceiver<Command>,
    log: Arc<dyn PresenceLog>,
    room_id: Uuid,
    user_name: String,
    mut throttle: CursorThrottle,
) {
    loop {
        let deadline = throttle.deadline().map(Instant::from_std);
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Move(position)) => {
                    throttle.on_move(position, Instant::now().into_std());
                }
                Some(Command::Hide(ack)) => {
                    throttle.cancel();
                    let _ = ack.send(log.remove(room_id).await);
                }
                Some(Command::Stop(ack)) => {
                    throttle.cancel();
                    let _ = ack.send(log.remove(room_id).await);
                    break;
                }
                None => break,
            },
            () = sleep_until(deadline) => {
                if let Some(position) = throttle.poll(Instant::now().into_std()) {
                    if let Err(e) = log.update(room_id, &user_name, position).await {
                        warn!(%room_id, error = %e, "presence: update failed");
                    }
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
