//! Practice session management
//!
//! This module provides the `SessionController` state machine that manages:
//! - The interview question being answered
//! - Media acquisition and the audio level meter
//! - Local audio recording and the session timer
//! - Frame sampling over the feedback channel
//! - The finalize handshake, upload and result handoff
//! - Teardown of every resource on every exit path

mod config;
mod controller;
pub mod questions;
mod state;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use state::{SessionState, SessionStatus};
