//! Drawroom client core: the whiteboard engine and its websocket transport.
//!
//! `whiteboard` holds one participant's optimistic view of a room and talks
//! to the server only through the traits in `log`. `remote` implements those
//! traits over the binary frame protocol.

pub mod config;
pub mod error;
pub mod log;
pub mod presence;
pub mod remote;
pub mod whiteboard;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::ClientConfig;
pub use error::SyncError;
pub use remote::FrameConnection;
pub use whiteboard::Whiteboard;
