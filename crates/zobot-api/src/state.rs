//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use zobot_chat::ChatEngine;
use zobot_core::config::ZobotConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The engine
/// does its own locking.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, fixed at startup.
    pub config: Arc<ZobotConfig>,
    /// Chat engine owning every session.
    pub engine: Arc<ChatEngine>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ZobotConfig, engine: ChatEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            start_time: Instant::now(),
        }
    }
}
