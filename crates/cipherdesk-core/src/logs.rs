//! Operation Log Gateway. The engine owns the log; entries pass through
//! untouched.

use chrono::Local;
use std::sync::Arc;
use tracing::info;

use crate::collaborators::{SavePicker, SaveRequest};
use crate::engine::{shielded, CipherEngine};
use crate::error::{Outcome, OrchestratorError};

pub struct LogGateway {
    engine: Arc<dyn CipherEngine>,
    picker: Arc<dyn SavePicker>,
}

impl LogGateway {
    pub fn new(engine: Arc<dyn CipherEngine>, picker: Arc<dyn SavePicker>) -> Self {
        Self { engine, picker }
    }

    pub async fn get(&self) -> Outcome<String> {
        let engine = Arc::clone(&self.engine);
        Ok(shielded(async move { engine.export_logs().await }).await?)
    }

    pub async fn clear(&self) -> Outcome<()> {
        let engine = Arc::clone(&self.engine);
        shielded(async move { engine.clear_logs().await }).await?;
        info!("operation log cleared");
        Ok(())
    }

    /// Whitespace-only logs are refused before the picker is shown.
    pub async fn export_to_file(&self) -> Outcome<()> {
        let contents = self.get().await?;
        if contents.trim().is_empty() {
            return Err(OrchestratorError::NothingToExport);
        }

        let request = SaveRequest::new("Export operation log", export_file_name());
        let destination = self
            .picker
            .pick_save_path(request)
            .await?
            .ok_or(OrchestratorError::Cancelled)?;

        tokio::fs::write(&destination, contents.as_bytes())
            .await
            .map_err(|e| OrchestratorError::Io(format!("write {}: {e}", destination.display())))?;
        info!(path = %destination.display(), bytes = contents.len(), "operation log exported");
        Ok(())
    }
}

pub fn export_file_name() -> String {
    format!("logs_{}.log", Local::now().format("%Y%m%d_%H%M%S"))
}
