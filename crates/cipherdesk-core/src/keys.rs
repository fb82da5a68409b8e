//! Key Management: RSA generation, validation and export; ECDH exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::collaborators::{SavePicker, SaveRequest};
use crate::dispatch::Operation;
use crate::engine::{shielded, CipherEngine};
use crate::error::{Outcome, OrchestratorError};
use crate::rsa_key::{self, NormalizedRsaKey};
use crate::settings::RsaLimits;

pub const PUBLIC_KEY_FILE: &str = "rsa-public-key.json";
pub const PRIVATE_KEY_FILE: &str = "rsa-private-key.json";
pub const KEYPAIR_FILE: &str = "rsa-keypair.json";

/// File name offered when saving a key used for `operation`.
pub fn suggested_key_file_name(operation: Option<Operation>) -> &'static str {
    match operation {
        Some(Operation::Encrypt) => PUBLIC_KEY_FILE,
        Some(Operation::Decrypt) => PRIVATE_KEY_FILE,
        None => KEYPAIR_FILE,
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdhKeyPair {
    pub private: String,
    pub public: String,
}

impl fmt::Debug for EcdhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdhKeyPair")
            .field("private", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}

pub struct KeyManagement {
    engine: Arc<dyn CipherEngine>,
    picker: Arc<dyn SavePicker>,
    limits: RsaLimits,
    default_key_file_name: String,
}

impl KeyManagement {
    pub fn new(
        engine: Arc<dyn CipherEngine>,
        picker: Arc<dyn SavePicker>,
        limits: RsaLimits,
        default_key_file_name: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            picker,
            limits,
            default_key_file_name: default_key_file_name.into(),
        }
    }

    /// Returns the engine's key pair as pretty-printed JSON.
    pub async fn generate_rsa_keypair(&self, bits: u32) -> Outcome<String> {
        let bits = self.limits.clamp(bits)?;
        let engine = Arc::clone(&self.engine);
        let raw = shielded(async move { engine.generate_rsa_keypair(bits).await }).await?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            OrchestratorError::ProcessingFailed(format!("engine returned a malformed RSA key pair: {e}"))
        })?;
        info!(bits, "rsa key pair generated");
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn normalize_rsa_key(&self, payload: &str, operation: Operation) -> Outcome<NormalizedRsaKey> {
        rsa_key::normalize(payload, operation)
    }

    /// Writes `payload` in canonical JSON form to a user-chosen destination.
    pub async fn save_key(&self, payload: &str, suggested_name: Option<&str>) -> Outcome<()> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| OrchestratorError::InvalidFormat(format!("key is not valid JSON: {e}")))?;
        let canonical = serde_json::to_string_pretty(&value)?;

        let suggested = suggested_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_key_file_name.as_str());
        let destination = self
            .picker
            .pick_save_path(SaveRequest::new("Save key", suggested))
            .await?
            .ok_or(OrchestratorError::Cancelled)?;

        tokio::fs::write(&destination, canonical.as_bytes())
            .await
            .map_err(|e| OrchestratorError::Io(format!("write {}: {e}", destination.display())))?;
        info!(path = %destination.display(), "key saved");
        Ok(())
    }

    pub async fn generate_ecdh_keypair(&self) -> Outcome<EcdhKeyPair> {
        let engine = Arc::clone(&self.engine);
        let raw = shielded(async move { engine.generate_ecdh_keypair().await }).await?;
        let pair: EcdhKeyPair = serde_json::from_str(&raw).map_err(|e| {
            OrchestratorError::ProcessingFailed(format!("engine returned a malformed ECDH key pair: {e}"))
        })?;
        info!("ecdh key pair generated");
        Ok(pair)
    }

    pub async fn compute_shared_secret(&self, private_key: &str, public_key: &str) -> Outcome<String> {
        let engine = Arc::clone(&self.engine);
        let private_key = private_key.to_string();
        let public_key = public_key.to_string();
        let secret = shielded(async move {
            engine
                .compute_ecdh_shared_secret(&private_key, &public_key)
                .await
        })
        .await?;
        Ok(secret)
    }
}
