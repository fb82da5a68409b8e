//! Cipher Dispatch: validates encrypt/decrypt requests, forwards them to the
//! engine, and swaps the engine's output in as the active file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{shielded, CipherEngine};
use crate::error::{Outcome, OrchestratorError};
use crate::file_slot::{FileRecord, FileSlot};
use crate::temp_files::{stat_record, TempFiles};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
        })
    }
}

impl FromStr for Operation {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "encrypt" => Ok(Operation::Encrypt),
            "decrypt" => Ok(Operation::Decrypt),
            other => Err(OrchestratorError::InvalidOptions(format!(
                "unknown operation \"{other}\""
            ))),
        }
    }
}

/// Algorithm identifiers understood by the engine. Unknown identifiers are
/// carried through as [`Algorithm::Other`]; the engine decides support.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Caesar,
    Vigenere,
    RunningKey,
    AesGcm,
    Rsa,
    Other(String),
}

impl Algorithm {
    pub const KNOWN: [Algorithm; 5] = [
        Algorithm::Caesar,
        Algorithm::Vigenere,
        Algorithm::RunningKey,
        Algorithm::AesGcm,
        Algorithm::Rsa,
    ];

    pub fn id(&self) -> &str {
        match self {
            Algorithm::Caesar => "caesar-cipher",
            Algorithm::Vigenere => "vigenere-cipher",
            Algorithm::RunningKey => "running-key-cipher",
            Algorithm::AesGcm => "aes-gcm",
            Algorithm::Rsa => "rsa",
            Algorithm::Other(id) => id,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Algorithm {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.is_empty() {
            return Err(OrchestratorError::InvalidOptions(
                "algorithm must not be empty".into(),
            ));
        }
        Ok(match id {
            "caesar-cipher" => Algorithm::Caesar,
            "vigenere-cipher" => Algorithm::Vigenere,
            "running-key-cipher" => Algorithm::RunningKey,
            "aes-gcm" => Algorithm::AesGcm,
            "rsa" => Algorithm::Rsa,
            other => Algorithm::Other(other.to_string()),
        })
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub key: String,
    pub algorithm: String,
}

impl ProcessOptions {
    pub fn new(key: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            algorithm: algorithm.into(),
        }
    }

    fn validate(&self) -> Outcome<Algorithm> {
        if self.key.is_empty() {
            return Err(OrchestratorError::InvalidOptions("key must not be empty".into()));
        }
        self.algorithm.parse()
    }
}

impl fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

pub struct CipherDispatch {
    slot: Arc<FileSlot>,
    temp: Arc<TempFiles>,
    engine: Arc<dyn CipherEngine>,
}

impl CipherDispatch {
    pub fn new(slot: Arc<FileSlot>, temp: Arc<TempFiles>, engine: Arc<dyn CipherEngine>) -> Self {
        Self { slot, temp, engine }
    }

    pub async fn process(&self, operation: Operation, options: &ProcessOptions) -> Outcome<FileRecord> {
        let current = self.slot.get().ok_or(OrchestratorError::NoActiveFile)?;
        if !is_file(&current.path).await {
            warn!(path = %current.path.display(), "active file vanished from disk");
            return Err(OrchestratorError::NoActiveFile);
        }
        let algorithm = options.validate()?;

        let engine = Arc::clone(&self.engine);
        let input = current.path.clone();
        let key = options.key.clone();
        let algorithm_id = algorithm.id().to_string();
        let call = async move {
            match operation {
                Operation::Encrypt => engine.encrypt(&input, &key, &algorithm_id).await,
                Operation::Decrypt => engine.decrypt(&input, &key, &algorithm_id).await,
            }
        };
        let output = match shielded(call).await {
            Ok(path) => path,
            Err(e) => {
                warn!(%operation, %algorithm, error = %e, "engine call failed");
                return Err(e.into());
            }
        };

        let next = stat_record(&output, output_name(&output))
            .await
            .map_err(|e| OrchestratorError::ProcessingFailed(format!("engine output unusable: {e}")))?;

        if let Err(rejected) = self.slot.replace_if_current(&current, next.clone()) {
            warn!(path = %rejected.path.display(), "active file changed while processing; output dropped");
            let referenced = self.slot.get().is_some_and(|r| r.path == rejected.path);
            if rejected.path != current.path && !referenced {
                self.temp.discard(&rejected.path).await;
            }
            return Err(OrchestratorError::ProcessingFailed(
                "active file changed while processing".into(),
            ));
        }

        if current.path != next.path {
            self.temp.discard(&current.path).await;
        }
        info!(%operation, %algorithm, name = %next.name, size = next.size, "file processed");
        Ok(next)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn output_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_ids_round_trip_and_pass_unknowns_through() {
        for known in Algorithm::KNOWN {
            assert_eq!(known.id().parse::<Algorithm>().unwrap(), known);
        }
        assert_eq!(
            "aes".parse::<Algorithm>().unwrap(),
            Algorithm::Other("aes".into())
        );
        let err = "   ".parse::<Algorithm>().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidOptions);
    }

    #[test]
    fn operations_parse_case_insensitively() {
        assert_eq!("Encrypt".parse::<Operation>().unwrap(), Operation::Encrypt);
        assert_eq!("decrypt".parse::<Operation>().unwrap(), Operation::Decrypt);
        assert!("sign".parse::<Operation>().is_err());
        assert_eq!(
            serde_json::to_string(&Operation::Decrypt).unwrap(),
            "\"decrypt\""
        );
    }

    #[test]
    fn options_reject_empty_fields_and_hide_the_key() {
        let err = ProcessOptions::new("", "aes").validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidOptions);
        let err = ProcessOptions::new("secret", "").validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidOptions);

        let opts = ProcessOptions::new("hunter2", "aes-gcm");
        assert_eq!(opts.validate().unwrap(), Algorithm::AesGcm);
        assert!(!format!("{opts:?}").contains("hunter2"));
    }

    #[test]
    fn output_name_is_the_file_name() {
        assert_eq!(output_name(Path::new("/scratch/a.txt.enc")), "a.txt.enc");
    }
}
