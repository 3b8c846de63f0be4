//! Drawroom sync server: stroke log, cursor presence and room directory
//! behind a single websocket endpoint.

pub mod config;
pub mod db;
pub mod frame;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
