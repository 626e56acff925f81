//! Transparency module for the session analysis engine.
//!
//! This module tracks what the engine consumed and emitted, supporting
//! audit of every run without retaining any session content.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, SharedTransparencyLog, TransparencyLog, TransparencyStats};
