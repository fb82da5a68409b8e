//! Shared Tauri application state.
use cipherdesk_core::Orchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Owns the active file slot and the scratch directory for this window.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}
