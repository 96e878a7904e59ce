use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{
    app_constants::{INSTALLED_MARKER_FILE, POST_INSTALL_MARKER_FILE},
    lifecycle::LifecycleState,
    logging::append_startup_log,
};

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("failed to write marker {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot mark post-install setup complete before installation is recorded")]
    NotInstalled,
}

/// Presence-only sentinel files under the user-data root.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    root: PathBuf,
}

impl MarkerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn installed_marker_path(&self) -> PathBuf {
        self.root.join(INSTALLED_MARKER_FILE)
    }

    pub fn post_install_marker_path(&self) -> PathBuf {
        self.root.join(POST_INSTALL_MARKER_FILE)
    }

    pub fn is_installed(&self) -> bool {
        self.installed_marker_path().is_file()
    }

    pub fn is_post_install_complete(&self) -> bool {
        self.post_install_marker_path().is_file()
    }

    pub fn mark_installed(&self) -> Result<(), MarkerError> {
        write_marker(&self.installed_marker_path(), "installed")
    }

    pub fn mark_post_install_complete(&self) -> Result<(), MarkerError> {
        if !self.is_installed() {
            return Err(MarkerError::NotInstalled);
        }
        write_marker(&self.post_install_marker_path(), "complete")
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        let installed = self.is_installed();
        let post_install_complete = self.is_post_install_complete();
        if !installed && post_install_complete {
            append_startup_log(&format!(
                "post-install marker present without install marker in {}; treating as fresh install",
                self.root.display()
            ));
        }
        LifecycleState::from_markers(installed, post_install_complete)
    }
}

fn write_marker(path: &Path, contents: &str) -> Result<(), MarkerError> {
    let to_error = |source| MarkerError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_error)?;
    }
    let mut file = File::create(path).map_err(to_error)?;
    file.write_all(contents.as_bytes()).map_err(to_error)?;
    file.sync_all().map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_root_has_no_markers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MarkerStore::new(dir.path().join("Mahall"));

        assert!(!store.is_installed());
        assert!(!store.is_post_install_complete());
        assert_eq!(store.lifecycle_state(), LifecycleState::FreshInstallNeeded);
    }

    #[test]
    fn mark_installed_creates_missing_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MarkerStore::new(dir.path().join("nested").join("Mahall"));

        store.mark_installed().expect("mark installed");

        assert!(store.is_installed());
        assert_eq!(store.lifecycle_state(), LifecycleState::PostInstallNeeded);
    }

    #[test]
    fn mark_post_install_complete_requires_install_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MarkerStore::new(dir.path());

        let error = store
            .mark_post_install_complete()
            .expect_err("must refuse without install marker");

        assert!(matches!(error, MarkerError::NotInstalled));
        assert!(!store.is_post_install_complete());
    }

    #[test]
    fn both_markers_yield_ready() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MarkerStore::new(dir.path());

        store.mark_installed().expect("mark installed");
        store
            .mark_post_install_complete()
            .expect("mark post-install complete");

        assert_eq!(store.lifecycle_state(), LifecycleState::Ready);
    }

    #[test]
    fn marker_write_failure_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").expect("write blocker");
        let store = MarkerStore::new(&blocker);

        let error = store.mark_installed().expect_err("root is a file");

        assert!(error.to_string().contains("not-a-dir"));
    }
}
