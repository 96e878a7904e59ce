use std::path::PathBuf;

use crate::{backend_config::AppEntry, lifecycle::WindowRole};

/// What a window shows: a materialized page file or the application entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSource {
    Artifact(PathBuf),
    Entry(AppEntry),
}

/// Native windowing as seen by the orchestrator. Each role maps to at most
/// one window; implementations must not call back into the orchestrator
/// synchronously.
pub trait WindowHost: Send + Sync {
    fn open_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String>;

    fn navigate_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String>;

    fn close_window(&self, role: WindowRole) -> Result<(), String>;

    fn focus_window(&self, role: WindowRole) -> Result<(), String>;
}
