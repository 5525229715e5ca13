//! Two-player chess board kept consistent across peers over a pub/sub channel.

pub mod channel;
pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod session;
pub mod websocket;

pub use error::{Severity, SyncError};
