//! # canvas-session
//!
//! Owns the mapping from conversation threads to their live
//! `(messages, artifact)` state. [`SessionManager`] is the single entry
//! point: it loads and persists threads through a
//! [`ThreadStore`](canvas_core::persistence::ThreadStore), opens response
//! streams through a [`StreamTransport`](canvas_core::transport::StreamTransport),
//! and routes edits, selections and comments into the active thread.

#![deny(unsafe_code)]

pub mod error;
mod live;
pub mod manager;
pub mod selection;

pub use error::SessionError;
pub use manager::{ChunkOutcome, SessionConfig, SessionManager};
pub use selection::{Selection, SelectionState};
