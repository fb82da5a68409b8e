//! Port to the external Cipher Engine.
//!
//! The engine performs every cryptographic transform and owns the operation
//! log. The orchestrator only ever talks to it through [`CipherEngine`].

mod process;
pub mod protocol;

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use process::ProcessEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine rejected the request: {0}")]
    Rejected(String),

    #[error("engine transport failed: {0}")]
    Transport(String),

    #[error("engine protocol violation: {0}")]
    Protocol(String),

    #[error("engine call panicked: {0}")]
    Panicked(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Transport(e.to_string())
    }
}

#[async_trait]
pub trait CipherEngine: Send + Sync {
    /// Transforms `file_path` and returns the path of the newly written output.
    async fn encrypt(&self, file_path: &Path, key: &str, algorithm: &str)
        -> Result<PathBuf, EngineError>;

    async fn decrypt(&self, file_path: &Path, key: &str, algorithm: &str)
        -> Result<PathBuf, EngineError>;

    /// Returns a JSON key pair document.
    async fn generate_rsa_keypair(&self, bits: u32) -> Result<String, EngineError>;

    /// Returns a JSON `{ "private": .., "public": .. }` document.
    async fn generate_ecdh_keypair(&self) -> Result<String, EngineError>;

    async fn compute_ecdh_shared_secret(
        &self,
        private_key: &str,
        public_key: &str,
    ) -> Result<String, EngineError>;

    async fn export_logs(&self) -> Result<String, EngineError>;

    async fn clear_logs(&self) -> Result<(), EngineError>;
}

/// Runs an engine call on its own task so a panic inside the engine surfaces
/// as [`EngineError::Panicked`] instead of unwinding through the caller.
pub(crate) async fn shielded<T, F>(call: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(call).await {
        Ok(result) => result,
        Err(join) => Err(EngineError::Panicked(join.to_string())),
    }
}
