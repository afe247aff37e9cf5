// src/lib.rs

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Cooperative cancellation flag shared with long-running operations
/// (the process wait loop and the log tailer check it each iteration).
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
