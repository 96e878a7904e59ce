use std::path::{Path, PathBuf};

use mahall_lifecycle::{AppEntry, WindowHost, WindowRole, WindowSource};
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};
use url::Url;

use crate::artifact_protocol;

#[cfg(any(windows, target_os = "android"))]
const BUNDLED_ORIGIN: &str = "http://tauri.localhost/";
#[cfg(not(any(windows, target_os = "android")))]
const BUNDLED_ORIGIN: &str = "tauri://localhost/";

pub(crate) fn bundled_entry_url(entry_path: &str) -> Result<Url, String> {
    Url::parse(BUNDLED_ORIGIN)
        .and_then(|origin| origin.join(entry_path.trim_start_matches('/')))
        .map_err(|error| format!("Invalid bundled entry path {entry_path}: {error}"))
}

fn artifact_url_for(path: &Path) -> Result<Url, String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Artifact path has no file name: {}", path.display()))?;
    artifact_protocol::artifact_url(file_name)
}

fn webview_url(source: &WindowSource) -> Result<WebviewUrl, String> {
    match source {
        WindowSource::Artifact(path) => artifact_url_for(path).map(WebviewUrl::External),
        WindowSource::Entry(AppEntry::DevServer(url)) => Ok(WebviewUrl::External(url.clone())),
        WindowSource::Entry(AppEntry::Bundled(entry_path)) => {
            Ok(WebviewUrl::App(PathBuf::from(entry_path)))
        }
    }
}

fn navigation_url(source: &WindowSource) -> Result<Url, String> {
    match source {
        WindowSource::Artifact(path) => artifact_url_for(path),
        WindowSource::Entry(AppEntry::DevServer(url)) => Ok(url.clone()),
        WindowSource::Entry(AppEntry::Bundled(entry_path)) => bundled_entry_url(entry_path),
    }
}

/// Native windows keyed by role label.
pub(crate) struct TauriWindowHost {
    app_handle: AppHandle,
}

impl TauriWindowHost {
    pub(crate) fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }

    fn window(&self, role: WindowRole) -> Result<tauri::WebviewWindow, String> {
        self.app_handle
            .get_webview_window(role.label())
            .ok_or_else(|| format!("{} window not found", role.label()))
    }
}

impl WindowHost for TauriWindowHost {
    fn open_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String> {
        let (width, height) = role.default_size();
        WebviewWindowBuilder::new(&self.app_handle, role.label(), webview_url(source)?)
            .title(role.title())
            .inner_size(width, height)
            .resizable(role == WindowRole::Main)
            .center()
            .build()
            .map(|_| ())
            .map_err(|error| format!("Failed to create {} window: {error}", role.label()))
    }

    fn navigate_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String> {
        let url = navigation_url(source)?;
        self.window(role)?
            .navigate(url)
            .map_err(|error| format!("Failed to navigate {} window: {error}", role.label()))
    }

    fn close_window(&self, role: WindowRole) -> Result<(), String> {
        self.window(role)?
            .destroy()
            .map_err(|error| format!("Failed to close {} window: {error}", role.label()))
    }

    fn focus_window(&self, role: WindowRole) -> Result<(), String> {
        let window = self.window(role)?;
        if let Err(error) = window.unminimize() {
            return Err(format!("Failed to restore {} window: {error}", role.label()));
        }
        window
            .show()
            .and_then(|()| window.set_focus())
            .map_err(|error| format!("Failed to focus {} window: {error}", role.label()))
    }
}

/// Brings whichever lifecycle window is open to the front.
pub(crate) fn focus_any_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = WindowRole::ALL
        .into_iter()
        .rev()
        .find_map(|role| app_handle.get_webview_window(role.label()))
    else {
        log("focus skipped: no window is open");
        return;
    };

    if let Err(error) = window.unminimize() {
        log(&format!("failed to restore window {}: {error}", window.label()));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show window {}: {error}", window.label()));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus window {}: {error}", window.label()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_entry_url_joins_entry_path() {
        let url = bundled_entry_url("/index.html").expect("url");
        assert!(url.as_str().ends_with("localhost/index.html"));
    }
}
