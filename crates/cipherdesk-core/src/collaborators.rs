//! Environment-provided collaborators. The core only invokes them.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Outcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub title: String,
    pub suggested_name: String,
}

impl SaveRequest {
    pub fn new(title: impl Into<String>, suggested_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            suggested_name: suggested_name.into(),
        }
    }
}

#[async_trait]
pub trait SavePicker: Send + Sync {
    /// `Ok(None)` means the user dismissed the picker.
    async fn pick_save_path(&self, request: SaveRequest) -> Outcome<Option<PathBuf>>;
}

#[async_trait]
pub trait SystemOpener: Send + Sync {
    /// Opens `path` with the OS default handler.
    async fn open(&self, path: &Path) -> Outcome<()>;
}
