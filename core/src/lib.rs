//! Core library: stream ingestion and state reduction for one research
//! session. Rendering lives outside this crate; consumers subscribe to
//! state snapshots and paint them however they like.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod session;
pub mod sse;
pub mod state;

pub use session::Session;
pub use state::SessionState;
