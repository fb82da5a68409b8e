use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Outcome, OrchestratorError};
use crate::paths;

pub const ENV_SCRATCH_DIR: &str = "CIPHERDESK_SCRATCH_DIR";
pub const ENV_ENGINE: &str = "CIPHERDESK_ENGINE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaLimits {
    pub min_bits: u32,
    pub max_bits: u32,
}

impl Default for RsaLimits {
    fn default() -> Self {
        Self {
            min_bits: 256,
            max_bits: 4096,
        }
    }
}

impl RsaLimits {
    /// Requests below the floor are rejected; requests above the ceiling are
    /// lowered to it.
    pub fn clamp(&self, bits: u32) -> Outcome<u32> {
        if bits < self.min_bits {
            return Err(OrchestratorError::InvalidKeySize {
                bits,
                min: self.min_bits,
            });
        }
        Ok(bits.min(self.max_bits.max(self.min_bits)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("cipherdesk-engine"),
            args: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scratch area for imported and intermediate files.
    pub scratch_dir: Option<PathBuf>,
    pub rsa: RsaLimits,
    pub engine: EngineSettings,
    pub default_key_file_name: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            rsa: RsaLimits::default(),
            engine: EngineSettings::default(),
            default_key_file_name: "rsa-keypair.json".into(),
            log_filter: "cipherdesk_core=info,cipherdesk_ui=info,cipherdesk_cli=info".into(),
        }
    }
}

impl Settings {
    /// Loads `settings.json` from the config dir when present, then applies
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::settings_path()?;
        let mut settings = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse settings {}", path.display()))
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_SCRATCH_DIR).ok(),
            std::env::var(ENV_ENGINE).ok(),
        );
    }

    pub fn apply_overrides(&mut self, scratch_dir: Option<String>, engine: Option<String>) {
        if let Some(dir) = scratch_dir.filter(|d| !d.trim().is_empty()) {
            self.scratch_dir = Some(PathBuf::from(dir));
        }
        if let Some(program) = engine.filter(|p| !p.trim().is_empty()) {
            self.engine.program = PathBuf::from(program);
        }
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(paths::default_scratch_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn clamp_rejects_below_floor_and_caps_ceiling() {
        let limits = RsaLimits::default();
        assert_eq!(limits.clamp(512).unwrap(), 512);
        assert_eq!(limits.clamp(256).unwrap(), 256);
        assert_eq!(limits.clamp(8192).unwrap(), 4096);
        let err = limits.clamp(16).unwrap_err();
        assert_eq!(err, OrchestratorError::InvalidKeySize { bits: 16, min: 256 });
    }

    #[test]
    fn partial_settings_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "rsa": { "min_bits": 512, "max_bits": 2048 },
                "engine": { "program": "/opt/engine" }
            })
            .to_string(),
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.rsa.min_bits, 512);
        assert_eq!(settings.engine.program, PathBuf::from("/opt/engine"));
        assert!(settings.engine.args.is_empty());
        assert_eq!(settings.default_key_file_name, "rsa-keypair.json");
        assert!(settings.scratch_dir.is_none());
    }

    #[test]
    fn malformed_settings_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parse settings"));
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut settings = Settings::default();
        settings.apply_overrides(Some("  ".into()), None);
        assert!(settings.scratch_dir.is_none());

        settings.apply_overrides(Some("/tmp/scratch".into()), Some("/usr/bin/engine".into()));
        assert_eq!(settings.scratch_dir(), PathBuf::from("/tmp/scratch"));
        assert_eq!(settings.engine.program, PathBuf::from("/usr/bin/engine"));
    }
}
