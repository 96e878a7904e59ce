use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{lifecycle::WindowRole, logging::append_desktop_log};

const INSTALL_PAGE: &str = include_str!("../assets/install.html");
const LOADING_PAGE: &str = include_str!("../assets/loading.html");
const POST_INSTALL_PAGE: &str = include_str!("../assets/post_install.html");

/// Generated markup pages shown before the real application entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Install,
    Loading,
    PostInstall,
}

impl ArtifactKind {
    /// The Main window starts out on the loading page until the backend
    /// answers.
    pub fn for_role(role: WindowRole) -> Self {
        match role {
            WindowRole::Install => Self::Install,
            WindowRole::Loading | WindowRole::Main => Self::Loading,
            WindowRole::PostInstall => Self::PostInstall,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Install => "mahall-install.html",
            Self::Loading => "mahall-loading.html",
            Self::PostInstall => "mahall-post-install.html",
        }
    }

    pub fn payload(self) -> &'static str {
        match self {
            Self::Install => INSTALL_PAGE,
            Self::Loading => LOADING_PAGE,
            Self::PostInstall => POST_INSTALL_PAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    scratch_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.scratch_dir.join(kind.file_name())
    }

    /// Writes the page for `role`, replacing any leftover file of the same name.
    pub fn materialize(&self, role: WindowRole) -> Result<TransientArtifact, String> {
        let kind = ArtifactKind::for_role(role);
        let path = self.path_for(kind);
        fs::create_dir_all(&self.scratch_dir).map_err(|error| {
            format!(
                "Failed to create scratch directory {}: {error}",
                self.scratch_dir.display()
            )
        })?;
        fs::write(&path, kind.payload())
            .map_err(|error| format!("Failed to write {}: {error}", path.display()))?;
        Ok(TransientArtifact { role, kind, path })
    }
}

/// A page file owned by exactly one window; removed when that window closes.
#[derive(Debug, PartialEq, Eq)]
pub struct TransientArtifact {
    role: WindowRole,
    kind: ArtifactKind,
    path: PathBuf,
}

impl TransientArtifact {
    pub fn role(&self) -> WindowRole {
        self.role
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file. A missing file is fine; other failures are logged
    /// and swallowed.
    pub fn discard(self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => append_desktop_log(&format!(
                "failed to remove {} artifact {}: {error}",
                self.role.label(),
                self.path.display()
            )),
        }
    }
}
