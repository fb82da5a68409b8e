//! The facade the IPC surface talks to. Owns the active-file slot and the
//! scratch directory, and wires the engine and environment collaborators
//! into dispatch, key management and the log gateway.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::collaborators::{SavePicker, SaveRequest, SystemOpener};
use crate::dispatch::{CipherDispatch, Operation, ProcessOptions};
use crate::engine::CipherEngine;
use crate::error::{Outcome, OrchestratorError};
use crate::file_slot::{FileRecord, FileSlot};
use crate::keys::KeyManagement;
use crate::logs::LogGateway;
use crate::settings::Settings;
use crate::temp_files::{stat_record, TempFiles};

pub struct Orchestrator {
    slot: Arc<FileSlot>,
    temp: Arc<TempFiles>,
    dispatch: CipherDispatch,
    keys: KeyManagement,
    logs: LogGateway,
    picker: Arc<dyn SavePicker>,
    opener: Arc<dyn SystemOpener>,
}

impl Orchestrator {
    pub fn new(
        settings: &Settings,
        engine: Arc<dyn CipherEngine>,
        picker: Arc<dyn SavePicker>,
        opener: Arc<dyn SystemOpener>,
    ) -> Outcome<Self> {
        let temp = Arc::new(TempFiles::new(settings.scratch_dir())?);
        let slot = Arc::new(FileSlot::new());
        info!(scratch = %temp.root().display(), "orchestrator ready");
        Ok(Self {
            dispatch: CipherDispatch::new(Arc::clone(&slot), Arc::clone(&temp), Arc::clone(&engine)),
            keys: KeyManagement::new(
                Arc::clone(&engine),
                Arc::clone(&picker),
                settings.rsa,
                settings.default_key_file_name.clone(),
            ),
            logs: LogGateway::new(engine, Arc::clone(&picker)),
            slot,
            temp,
            picker,
            opener,
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        self.temp.root()
    }

    pub fn keys(&self) -> &KeyManagement {
        &self.keys
    }

    pub fn logs(&self) -> &LogGateway {
        &self.logs
    }

    /// Imports `bytes` as the active file. The file it replaces is removed
    /// only once the new one is on disk.
    pub async fn store(&self, name: &str, bytes: &[u8]) -> Outcome<FileRecord> {
        let record = self.temp.store(name, bytes).await?;
        if let Some(previous) = self.slot.set(record.clone()) {
            if previous.path != record.path {
                self.temp.discard(&previous.path).await;
            }
        }
        Ok(record)
    }

    pub async fn store_text(&self, text: &str) -> Outcome<FileRecord> {
        if text.is_empty() {
            return Err(OrchestratorError::InvalidOptions("text must not be empty".into()));
        }
        let name = format!("text_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
        self.store(&name, text.as_bytes()).await
    }

    /// The active file, re-checked on disk. An empty slot or a file that no
    /// longer exists is `NoActiveFile`.
    pub async fn get_info(&self) -> Outcome<FileRecord> {
        self.resolve(None).await
    }

    pub async fn process(&self, operation: Operation, options: &ProcessOptions) -> Outcome<FileRecord> {
        self.dispatch.process(operation, options).await
    }

    /// Drops the active file. Clearing an empty slot is a no-op.
    pub async fn clear(&self) {
        if let Some(record) = self.slot.clear() {
            self.temp.discard(&record.path).await;
            info!(name = %record.name, "active file cleared");
        }
    }

    /// Copies `path` (or the active file) to a picker-chosen destination.
    pub async fn download(&self, path: Option<&Path>) -> Outcome<PathBuf> {
        let source = self.resolve(path).await?;
        let request = SaveRequest::new("Save file", source.name.clone());
        let destination = self
            .picker
            .pick_save_path(request)
            .await?
            .ok_or(OrchestratorError::Cancelled)?;

        tokio::fs::copy(&source.path, &destination).await.map_err(|e| {
            OrchestratorError::Io(format!(
                "copy {} to {}: {e}",
                source.path.display(),
                destination.display()
            ))
        })?;
        info!(from = %source.path.display(), to = %destination.display(), "file downloaded");
        Ok(destination)
    }

    /// Opens `path` (or the active file) with the system default handler.
    pub async fn preview(&self, path: Option<&Path>) -> Outcome<()> {
        let source = self.resolve(path).await?;
        self.opener.open(&source.path).await
    }

    pub async fn end_session(&self) {
        self.clear().await;
        self.temp.remove_root_if_empty().await;
    }

    async fn resolve(&self, path: Option<&Path>) -> Outcome<FileRecord> {
        match path {
            Some(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                stat_record(path, name).await
            }
            None => {
                let record = self.slot.get().ok_or(OrchestratorError::NoActiveFile)?;
                match stat_record(&record.path, record.name.clone()).await {
                    Ok(fresh) => Ok(FileRecord { id: record.id, ..fresh }),
                    Err(e) => {
                        warn!(path = %record.path.display(), error = %e, "active file unavailable");
                        Err(OrchestratorError::NoActiveFile)
                    }
                }
            }
        }
    }
}
