//! Cryptographic workflow orchestration over an external cipher engine.

pub mod collaborators;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod file_slot;
pub mod keys;
pub mod logs;
pub mod orchestrator;
pub mod paths;
pub mod rsa_key;
pub mod settings;
pub mod temp_files;

pub use collaborators::{SavePicker, SaveRequest, SystemOpener};
pub use dispatch::{Algorithm, Operation, ProcessOptions};
pub use engine::{CipherEngine, EngineError, ProcessEngine};
pub use error::{ErrorKind, KeyField, OrchestratorError, Outcome};
pub use file_slot::FileRecord;
pub use keys::{suggested_key_file_name, EcdhKeyPair};
pub use orchestrator::Orchestrator;
pub use rsa_key::NormalizedRsaKey;
pub use settings::Settings;
