//! HLS multi-track negotiation
//!
//! Keeps a player on the audio and subtitle track a user picked, even when
//! the adaptive engine does not expose track switching:
//! - Track catalog built from host and stream-discovered tracks
//! - Master playlist synthesis and rewriting
//! - Strategy escalation from native engine control to source substitution
//! - Drift enforcement while a session is attached
//! - A small manifest server (`hls-track-server`)

pub mod catalog;
pub mod config;
pub mod config_file;
pub mod error;
pub mod http;
pub mod negotiate;
pub mod player;
pub mod playlist;
pub mod session;
pub mod state;

#[cfg(test)]
mod integration;

pub use error::{Error, NegotiationError, Result};
pub use session::{Session, SessionState};
