use std::{
    env,
    path::{Path, PathBuf},
};

use crate::app_constants::{
    APP_DIR_NAME, BACKEND_SOURCE_DIR_ENV, DATA_DIR_ENV, DESKTOP_LOG_DIR, SCRATCH_DIR_ENV,
};

pub(crate) fn env_path(key: &str) -> Option<PathBuf> {
    let raw = env::var_os(key)?;
    let path = PathBuf::from(raw);
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Per-user data root shared by the shell and the backend.
pub fn default_data_root() -> Option<PathBuf> {
    env_path(DATA_DIR_ENV).or_else(|| dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME)))
}

pub fn default_scratch_dir() -> PathBuf {
    env_path(SCRATCH_DIR_ENV).unwrap_or_else(env::temp_dir)
}

pub fn log_dir_for(data_root: &Path) -> PathBuf {
    data_root.join(DESKTOP_LOG_DIR)
}

pub fn workspace_root_dir() -> PathBuf {
    let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..");
    candidate.canonicalize().unwrap_or(candidate)
}

fn is_backend_source_root(candidate: &Path) -> bool {
    candidate.join("manage.py").is_file()
}

pub fn detect_backend_source_root() -> Option<PathBuf> {
    if let Some(candidate) = env_path(BACKEND_SOURCE_DIR_ENV) {
        if is_backend_source_root(&candidate) {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    let workspace_root = workspace_root_dir();
    [workspace_root.join("backend"), workspace_root]
        .into_iter()
        .find(|candidate| is_backend_source_root(candidate))
        .map(|candidate| candidate.canonicalize().unwrap_or(candidate))
}
