#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

mod bridge;
mod commands;
mod state;

use cipherdesk_core::{Orchestrator, ProcessEngine, Settings};
use std::sync::Arc;
use tauri::{Manager, RunEvent};
use tracing::{info, warn};

use bridge::{DialogPicker, ShellOpener};
use state::AppState;

fn main() {
    let loaded = Settings::load();
    let filter = loaded
        .as_ref()
        .map(|s| s.log_filter.clone())
        .unwrap_or_else(|_| Settings::default().log_filter);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    let settings = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "settings unavailable, using defaults");
        let mut settings = Settings::default();
        settings.apply_env();
        settings
    });

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            let handle = app.handle().clone();
            let engine = Arc::new(ProcessEngine::from_settings(&settings.engine));
            let orchestrator = Orchestrator::new(
                &settings,
                engine,
                Arc::new(DialogPicker::new(handle.clone())),
                Arc::new(ShellOpener::new(handle)),
            )?;
            app.manage(AppState::new(orchestrator));
            info!("cipherdesk started");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Active file
            commands::file_store,
            commands::file_store_text,
            commands::file_get_info,
            commands::file_process,
            commands::file_clear,
            commands::file_download,
            commands::file_preview,
            // Keys
            commands::rsa_generate_keypair,
            commands::rsa_normalize_key,
            commands::rsa_save_key,
            commands::ecdh_generate_keypair,
            commands::ecdh_compute_shared_secret,
            // Operation log
            commands::logs_get,
            commands::logs_clear,
            commands::logs_export,
        ])
        .build(tauri::generate_context!())
        .expect("error while building cipherdesk")
        .run(|app, event| {
            if let RunEvent::Exit = event {
                if let Some(state) = app.try_state::<AppState>() {
                    tauri::async_runtime::block_on(state.orchestrator.end_session());
                }
            }
        });
}
