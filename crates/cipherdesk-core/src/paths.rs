use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "cipherdesk";
pub const APP_NAME: &str = "cipherdesk";

pub const SETTINGS_FILE: &str = "settings.json";

fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine application directories"))
}

pub fn data_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn settings_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

/// Falls back to the system temp dir on hosts without a home directory.
pub fn default_scratch_dir() -> PathBuf {
    data_dir()
        .map(|d| d.join("scratch"))
        .unwrap_or_else(|_| std::env::temp_dir().join("cipherdesk-scratch"))
}
