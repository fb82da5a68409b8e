//! Picker and opener backed by Tauri plugins.

use async_trait::async_trait;
use cipherdesk_core::{Outcome, OrchestratorError, SavePicker, SaveRequest, SystemOpener};
use std::path::{Path, PathBuf};
use tauri::AppHandle;
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_shell::ShellExt;

pub struct DialogPicker {
    app: AppHandle,
}

impl DialogPicker {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl SavePicker for DialogPicker {
    async fn pick_save_path(&self, request: SaveRequest) -> Outcome<Option<PathBuf>> {
        let app = self.app.clone();
        // The blocking variant must stay off the main thread.
        let picked = tauri::async_runtime::spawn_blocking(move || {
            app.dialog()
                .file()
                .set_title(&request.title)
                .set_file_name(&request.suggested_name)
                .blocking_save_file()
        })
        .await
        .map_err(|e| OrchestratorError::Io(format!("save dialog failed: {e}")))?;

        match picked {
            None => Ok(None),
            Some(file) => file
                .into_path()
                .map(Some)
                .map_err(|e| OrchestratorError::Io(format!("unusable save location: {e}"))),
        }
    }
}

pub struct ShellOpener {
    app: AppHandle,
}

impl ShellOpener {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

#[async_trait]
impl SystemOpener for ShellOpener {
    async fn open(&self, path: &Path) -> Outcome<()> {
        #[allow(deprecated)]
        let opened = self
            .app
            .shell()
            .open(path.to_string_lossy().into_owned(), None);
        opened.map_err(|e| OrchestratorError::Io(format!("open {}: {e}", path.display())))
    }
}
