/// Where the shell stands, derived from the two on-disk markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    FreshInstallNeeded,
    PostInstallNeeded,
    Ready,
}

impl LifecycleState {
    /// `(false, true)` cannot be written by the shell; if it shows up on disk
    /// it reads as the least-progressed state.
    pub fn from_markers(installed: bool, post_install_complete: bool) -> Self {
        match (installed, post_install_complete) {
            (true, true) => Self::Ready,
            (true, false) => Self::PostInstallNeeded,
            (false, _) => Self::FreshInstallNeeded,
        }
    }

    pub fn boot_window(self) -> WindowRole {
        match self {
            Self::FreshInstallNeeded => WindowRole::Install,
            Self::PostInstallNeeded => WindowRole::PostInstall,
            Self::Ready => WindowRole::Main,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FreshInstallNeeded => "fresh-install-needed",
            Self::PostInstallNeeded => "post-install-needed",
            Self::Ready => "ready",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowRole {
    Install,
    Loading,
    PostInstall,
    Main,
}

impl WindowRole {
    pub const ALL: [WindowRole; 4] = [
        WindowRole::Install,
        WindowRole::Loading,
        WindowRole::PostInstall,
        WindowRole::Main,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Loading => "loading",
            Self::PostInstall => "post-install",
            Self::Main => "main",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.label() == label)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Install => "Mahall Setup",
            Self::Loading => "Mahall",
            Self::PostInstall => "Mahall - Getting Started",
            Self::Main => "Mahall",
        }
    }

    pub fn default_size(self) -> (f64, f64) {
        match self {
            Self::Install | Self::PostInstall => (720.0, 560.0),
            Self::Loading => (480.0, 320.0),
            Self::Main => (1200.0, 800.0),
        }
    }
}
