//! IPC command handlers. Each maps one orchestrator call onto the result
//! channel; failures reach the UI as `{ kind, message }`.

use cipherdesk_core::{
    EcdhKeyPair, ErrorKind, FileRecord, Operation, OrchestratorError, ProcessOptions,
};
use serde::Serialize;
use std::path::PathBuf;
use tauri::State;
use thiserror::Error;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<OrchestratorError> for CommandError {
    fn from(e: OrchestratorError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Active file
// ============================================================================

#[tauri::command]
pub async fn file_store(
    name: String,
    bytes: Vec<u8>,
    state: State<'_, AppState>,
) -> CommandResult<FileRecord> {
    Ok(state.orchestrator.store(&name, &bytes).await?)
}

#[tauri::command]
pub async fn file_store_text(text: String, state: State<'_, AppState>) -> CommandResult<FileRecord> {
    Ok(state.orchestrator.store_text(&text).await?)
}

#[tauri::command]
pub async fn file_get_info(state: State<'_, AppState>) -> CommandResult<FileRecord> {
    Ok(state.orchestrator.get_info().await?)
}

#[tauri::command]
pub async fn file_process(
    operation: Operation,
    options: ProcessOptions,
    state: State<'_, AppState>,
) -> CommandResult<FileRecord> {
    Ok(state.orchestrator.process(operation, &options).await?)
}

#[tauri::command]
pub async fn file_clear(state: State<'_, AppState>) -> CommandResult<()> {
    state.orchestrator.clear().await;
    Ok(())
}

#[tauri::command]
pub async fn file_download(
    path: Option<PathBuf>,
    state: State<'_, AppState>,
) -> CommandResult<PathBuf> {
    Ok(state.orchestrator.download(path.as_deref()).await?)
}

#[tauri::command]
pub async fn file_preview(path: Option<PathBuf>, state: State<'_, AppState>) -> CommandResult<()> {
    Ok(state.orchestrator.preview(path.as_deref()).await?)
}

// ============================================================================
// Keys
// ============================================================================

#[tauri::command]
pub async fn rsa_generate_keypair(bits: u32, state: State<'_, AppState>) -> CommandResult<String> {
    Ok(state.orchestrator.keys().generate_rsa_keypair(bits).await?)
}

/// Returns the flat key JSON for `operation`.
#[tauri::command]
pub async fn rsa_normalize_key(
    payload: String,
    operation: Operation,
    state: State<'_, AppState>,
) -> CommandResult<String> {
    let key = state.orchestrator.keys().normalize_rsa_key(&payload, operation)?;
    Ok(key.to_json()?)
}

#[tauri::command]
pub async fn rsa_save_key(
    payload: String,
    suggested_name: Option<String>,
    state: State<'_, AppState>,
) -> CommandResult<()> {
    Ok(state
        .orchestrator
        .keys()
        .save_key(&payload, suggested_name.as_deref())
        .await?)
}

#[tauri::command]
pub async fn ecdh_generate_keypair(state: State<'_, AppState>) -> CommandResult<EcdhKeyPair> {
    Ok(state.orchestrator.keys().generate_ecdh_keypair().await?)
}

#[tauri::command]
pub async fn ecdh_compute_shared_secret(
    private_key: String,
    public_key: String,
    state: State<'_, AppState>,
) -> CommandResult<String> {
    Ok(state
        .orchestrator
        .keys()
        .compute_shared_secret(&private_key, &public_key)
        .await?)
}

// ============================================================================
// Operation log
// ============================================================================

#[tauri::command]
pub async fn logs_get(state: State<'_, AppState>) -> CommandResult<String> {
    Ok(state.orchestrator.logs().get().await?)
}

#[tauri::command]
pub async fn logs_clear(state: State<'_, AppState>) -> CommandResult<()> {
    Ok(state.orchestrator.logs().clear().await?)
}

#[tauri::command]
pub async fn logs_export(state: State<'_, AppState>) -> CommandResult<()> {
    Ok(state.orchestrator.logs().export_to_file().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherdesk_core::KeyField;

    #[test]
    fn errors_serialise_with_their_kind() {
        let err: CommandError = OrchestratorError::Cancelled.into();
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "cancelled");
        assert_eq!(value["message"], "Cancelled by user");

        let err: CommandError = OrchestratorError::MissingKeyField(KeyField::D).into();
        assert_eq!(err.kind, ErrorKind::MissingKeyField);
        assert!(err.message.contains("\"d\""));
    }
}
