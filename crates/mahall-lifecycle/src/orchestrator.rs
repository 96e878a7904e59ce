use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
};

use crate::{
    artifacts::{ArtifactStore, TransientArtifact},
    backend_config::ShellConfig,
    lifecycle::{LifecycleState, WindowRole},
    logging::{append_backend_log, append_desktop_log, append_shutdown_log, append_startup_log},
    markers::MarkerStore,
    process_control::{platform_terminator, ProcessTerminator},
    readiness::spawn_readiness_probe,
    supervisor::BackendSupervisor,
    window_host::{WindowHost, WindowSource},
};

type WindowRegistry = HashMap<WindowRole, Option<TransientArtifact>>;

struct OrchestratorInner {
    config: ShellConfig,
    host: Arc<dyn WindowHost>,
    markers: MarkerStore,
    artifacts: ArtifactStore,
    supervisor: BackendSupervisor,
    // A role present with `None` is reserved or shows no artifact.
    windows: Mutex<WindowRegistry>,
    main_swapped: AtomicBool,
    probe_cancel: Mutex<Option<Arc<AtomicBool>>>,
    backend_busy: AtomicBool,
    shutting_down: AtomicBool,
}

impl OrchestratorInner {
    fn lock_windows(&self) -> MutexGuard<'_, WindowRegistry> {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn replace_probe_cancel(&self, next: Option<Arc<AtomicBool>>) {
        let previous = {
            let mut guard = self
                .probe_cancel
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *guard, next)
        };
        if let Some(previous) = previous {
            previous.store(true, Ordering::Release);
        }
    }
}

/// Owns every piece of lifecycle state: open windows and their artifacts,
/// the backend supervisor, and the readiness probe.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl LifecycleOrchestrator {
    pub fn new(config: ShellConfig, host: Arc<dyn WindowHost>) -> Self {
        Self::with_terminator(config, host, platform_terminator())
    }

    pub fn with_terminator(
        config: ShellConfig,
        host: Arc<dyn WindowHost>,
        terminator: Arc<dyn ProcessTerminator>,
    ) -> Self {
        let supervisor = BackendSupervisor::new(
            config.mode,
            config.backend_launch.clone(),
            config.backend_bind.clone(),
            config.ready_settle,
            terminator,
        );
        Self {
            inner: Arc::new(OrchestratorInner {
                markers: MarkerStore::new(config.data_root.clone()),
                artifacts: ArtifactStore::new(config.scratch_dir.clone()),
                supervisor,
                config,
                host,
                windows: Mutex::new(HashMap::new()),
                main_swapped: AtomicBool::new(false),
                probe_cancel: Mutex::new(None),
                backend_busy: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.inner.config
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.inner.markers
    }

    pub fn supervisor(&self) -> &BackendSupervisor {
        &self.inner.supervisor
    }

    pub fn backend_busy_flag(&self) -> &AtomicBool {
        &self.inner.backend_busy
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    /// Reads the markers once and opens the matching window.
    pub fn boot(&self) -> Result<LifecycleState, String> {
        let state = self.inner.markers.lifecycle_state();
        append_startup_log(&format!(
            "boot: lifecycle state {} ({} mode), data root {}",
            state.as_str(),
            if self.inner.config.mode.is_development() {
                "development"
            } else {
                "production"
            },
            self.inner.markers.root().display()
        ));
        self.open_role(state.boot_window())?;
        Ok(state)
    }

    /// Opens the window for `role`, or focuses it when it is already open.
    pub fn open_role(&self, role: WindowRole) -> Result<(), String> {
        if self.is_shutting_down() {
            return Err(format!(
                "Cannot open {} window during shutdown.",
                role.label()
            ));
        }

        {
            let mut windows = self.inner.lock_windows();
            if windows.contains_key(&role) {
                drop(windows);
                append_desktop_log(&format!("{} window already open, focusing", role.label()));
                return self.inner.host.focus_window(role);
            }
            windows.insert(role, None);
        }

        let shows_entry_directly = role == WindowRole::Main && self.inner.config.mode.is_development();
        let (source, artifact) = if shows_entry_directly {
            (WindowSource::Entry(self.inner.config.app_entry.clone()), None)
        } else {
            match self.inner.artifacts.materialize(role) {
                Ok(artifact) => (
                    WindowSource::Artifact(artifact.path().to_path_buf()),
                    Some(artifact),
                ),
                Err(error) => {
                    self.inner.lock_windows().remove(&role);
                    return Err(error);
                }
            }
        };

        if let Err(error) = self.inner.host.open_window(role, &source) {
            self.inner.lock_windows().remove(&role);
            if let Some(artifact) = artifact {
                artifact.discard();
            }
            return Err(format!("Failed to open {} window: {error}", role.label()));
        }
        append_desktop_log(&format!("{} window opened", role.label()));

        if let Some(artifact) = artifact {
            // The window may already have been closed by the user.
            let orphaned = match self.inner.lock_windows().get_mut(&role) {
                Some(slot) => {
                    *slot = Some(artifact);
                    None
                }
                None => Some(artifact),
            };
            if let Some(artifact) = orphaned {
                artifact.discard();
            }
        }

        if role == WindowRole::Main && !shows_entry_directly {
            self.inner.main_swapped.store(false, Ordering::Release);
            self.start_backend_and_probe();
        }
        Ok(())
    }

    fn start_backend_and_probe(&self) {
        if let Err(error) = self
            .inner
            .supervisor
            .start(|| append_backend_log("backend announced readiness"))
        {
            append_backend_log(&format!("backend start failed: {error}"));
        }
        self.spawn_probe();
    }

    fn spawn_probe(&self) {
        let cancel = Arc::new(AtomicBool::new(false));
        self.inner.replace_probe_cancel(Some(Arc::clone(&cancel)));
        let weak: Weak<OrchestratorInner> = Arc::downgrade(&self.inner);
        let spawned = spawn_readiness_probe(
            self.inner.config.backend_url.clone(),
            self.inner.config.ready_poll_interval,
            self.inner.config.ready_probe_timeout,
            cancel,
            move |_status| {
                if let Some(inner) = weak.upgrade() {
                    LifecycleOrchestrator { inner }.handle_backend_ready();
                }
            },
        );
        if let Err(error) = spawned {
            append_desktop_log(&format!("failed to start readiness probe: {error}"));
        }
    }

    /// Swaps the Main window from the loading page to the application entry.
    /// Only the first signal while Main is open has an effect; returns whether
    /// this call performed the swap.
    pub fn handle_backend_ready(&self) -> bool {
        if self.inner.config.mode.is_development() {
            return false;
        }
        if !self.inner.lock_windows().contains_key(&WindowRole::Main) {
            append_desktop_log("backend ready signal ignored: main window is not open");
            return false;
        }
        if self.inner.main_swapped.swap(true, Ordering::AcqRel) {
            return false;
        }

        let entry = WindowSource::Entry(self.inner.config.app_entry.clone());
        match self.inner.host.navigate_window(WindowRole::Main, &entry) {
            Ok(()) => {
                self.inner.replace_probe_cancel(None);
                append_desktop_log("main window switched to the application entry");
                true
            }
            Err(error) => {
                append_desktop_log(&format!("failed to show application entry: {error}"));
                self.inner.main_swapped.store(false, Ordering::Release);
                // The probe that signalled has finished; poll again for a retry.
                if !self.is_shutting_down() && self.is_open(WindowRole::Main) {
                    self.spawn_probe();
                }
                false
            }
        }
    }

    /// Opens `to` before closing `from`, so the host never sees zero windows
    /// in between.
    pub fn transition(&self, from: WindowRole, to: WindowRole) -> Result<(), String> {
        append_desktop_log(&format!(
            "transition {} -> {}",
            from.label(),
            to.label()
        ));
        self.open_role(to)?;
        self.close_role(from);
        Ok(())
    }

    pub fn close_role(&self, role: WindowRole) {
        if !self.is_open(role) {
            return;
        }
        if let Err(error) = self.inner.host.close_window(role) {
            append_desktop_log(&format!("failed to close {} window: {error}", role.label()));
        }
        self.handle_window_closed(role);
    }

    /// Forgets the window and deletes its artifact. Safe to call more than
    /// once for the same close.
    pub fn handle_window_closed(&self, role: WindowRole) {
        let Some(artifact) = self.inner.lock_windows().remove(&role) else {
            return;
        };
        if role == WindowRole::Main {
            self.inner.replace_probe_cancel(None);
            self.inner.main_swapped.store(false, Ordering::Release);
        }
        if let Some(artifact) = artifact {
            artifact.discard();
        }
        append_desktop_log(&format!("{} window closed", role.label()));
    }

    pub fn is_open(&self, role: WindowRole) -> bool {
        self.inner.lock_windows().contains_key(&role)
    }

    pub fn open_windows(&self) -> Vec<WindowRole> {
        let windows = self.inner.lock_windows();
        WindowRole::ALL
            .into_iter()
            .filter(|role| windows.contains_key(role))
            .collect()
    }

    pub fn main_swapped(&self) -> bool {
        self.inner.main_swapped.load(Ordering::Acquire)
    }

    /// Cancels the probe, stops the backend and removes leftover artifacts.
    /// Runs once; later calls return immediately.
    pub fn shutdown(&self, reason: &str) {
        if self.inner.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        append_shutdown_log(&format!("shutdown requested: {reason}"));
        self.inner.replace_probe_cancel(None);
        self.inner.supervisor.shutdown();

        let leftovers: Vec<TransientArtifact> = self
            .inner
            .lock_windows()
            .drain()
            .filter_map(|(_, artifact)| artifact)
            .collect();
        for artifact in leftovers {
            artifact.discard();
        }
        append_shutdown_log("shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use url::Url;

    use super::*;
    use crate::{
        backend_config::{AppEntry, ExecutionMode},
        launch_plan::LaunchPlan,
        process_control::SignalTerminator,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum HostCall {
        Open(WindowRole, WindowSource),
        Navigate(WindowRole, WindowSource),
        Close(WindowRole),
        Focus(WindowRole),
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<HostCall>>,
        fail_open: AtomicBool,
    }

    impl RecordingHost {
        fn calls(&self) -> Vec<HostCall> {
            self.calls.lock().expect("calls").clone()
        }

        fn record(&self, call: HostCall) {
            self.calls.lock().expect("calls").push(call);
        }
    }

    impl WindowHost for RecordingHost {
        fn open_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String> {
            if self.fail_open.load(Ordering::Relaxed) {
                return Err("no display".to_string());
            }
            self.record(HostCall::Open(role, source.clone()));
            Ok(())
        }

        fn navigate_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String> {
            self.record(HostCall::Navigate(role, source.clone()));
            Ok(())
        }

        fn close_window(&self, role: WindowRole) -> Result<(), String> {
            self.record(HostCall::Close(role));
            Ok(())
        }

        fn focus_window(&self, role: WindowRole) -> Result<(), String> {
            self.record(HostCall::Focus(role));
            Ok(())
        }
    }

    fn dev_config(root: &Path) -> ShellConfig {
        ShellConfig {
            mode: ExecutionMode::Development,
            data_root: root.join("data"),
            scratch_dir: root.join("scratch"),
            backend_bind: "127.0.0.1:8000".to_string(),
            backend_url: "http://127.0.0.1:8000/".to_string(),
            backend_launch: LaunchPlan::for_executable(
                &root.join("missing-backend"),
                root.to_path_buf(),
            ),
            backup_tool: root.join("missing-backup-tool"),
            app_entry: AppEntry::DevServer(
                Url::parse("http://localhost:5174/").expect("dev url"),
            ),
            migration_timeout: Duration::from_secs(5),
            backup_timeout: Duration::from_secs(5),
            ready_settle: Duration::ZERO,
            ready_poll_interval: Duration::from_millis(50),
            ready_probe_timeout: Duration::from_millis(200),
        }
    }

    fn orchestrator(config: ShellConfig) -> (LifecycleOrchestrator, Arc<RecordingHost>) {
        let host = Arc::new(RecordingHost::default());
        let orchestrator = LifecycleOrchestrator::with_terminator(
            config,
            Arc::clone(&host) as Arc<dyn WindowHost>,
            Arc::new(SignalTerminator),
        );
        (orchestrator, host)
    }

    #[test]
    fn boot_on_fresh_root_opens_install_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (orchestrator, host) = orchestrator(dev_config(dir.path()));

        let state = orchestrator.boot().expect("boot");

        assert_eq!(state, LifecycleState::FreshInstallNeeded);
        let artifact_path = dir.path().join("scratch/mahall-install.html");
        assert_eq!(
            host.calls(),
            vec![HostCall::Open(
                WindowRole::Install,
                WindowSource::Artifact(artifact_path.clone())
            )]
        );
        assert!(artifact_path.is_file());
    }

    #[test]
    fn opening_an_open_role_focuses_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (orchestrator, host) = orchestrator(dev_config(dir.path()));

        orchestrator.open_role(WindowRole::Install).expect("open");
        orchestrator.open_role(WindowRole::Install).expect("focus");

        assert_eq!(host.calls().len(), 2);
        assert_eq!(host.calls()[1], HostCall::Focus(WindowRole::Install));
        assert_eq!(orchestrator.open_windows(), vec![WindowRole::Install]);
    }

    #[test]
    fn transition_opens_next_before_closing_current_and_removes_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (orchestrator, host) = orchestrator(dev_config(dir.path()));
        orchestrator.open_role(WindowRole::Install).expect("open");
        let install_page = dir.path().join("scratch/mahall-install.html");

        orchestrator
            .transition(WindowRole::Install, WindowRole::PostInstall)
            .expect("transition");

        let calls = host.calls();
        assert!(matches!(calls[1], HostCall::Open(WindowRole::PostInstall, _)));
        assert_eq!(calls[2], HostCall::Close(WindowRole::Install));
        assert!(!install_page.exists());
        assert_eq!(orchestrator.open_windows(), vec![WindowRole::PostInstall]);
    }

    #[test]
    fn development_main_window_loads_entry_directly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dev_config(dir.path());
        let entry = config.app_entry.clone();
        let (orchestrator, host) = orchestrator(config);

        orchestrator.open_role(WindowRole::Main).expect("open main");

        assert_eq!(
            host.calls(),
            vec![HostCall::Open(WindowRole::Main, WindowSource::Entry(entry))]
        );
        assert!(!orchestrator.handle_backend_ready());
        assert!(!orchestrator.supervisor().is_running());
    }

    #[test]
    fn failed_open_releases_reservation_and_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (orchestrator, host) = orchestrator(dev_config(dir.path()));
        host.fail_open.store(true, Ordering::Relaxed);

        let error = orchestrator
            .open_role(WindowRole::PostInstall)
            .expect_err("open fails");

        assert!(error.contains("no display"));
        assert!(orchestrator.open_windows().is_empty());
        assert!(!dir.path().join("scratch/mahall-post-install.html").exists());
    }

    #[test]
    fn handle_window_closed_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (orchestrator, _host) = orchestrator(dev_config(dir.path()));
        orchestrator.open_role(WindowRole::Install).expect("open");

        orchestrator.handle_window_closed(WindowRole::Install);
        orchestrator.handle_window_closed(WindowRole::Install);

        assert!(orchestrator.open_windows().is_empty());
    }

    #[test]
    fn shutdown_discards_artifacts_and_blocks_new_windows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (orchestrator, _host) = orchestrator(dev_config(dir.path()));
        orchestrator.open_role(WindowRole::PostInstall).expect("open");

        orchestrator.shutdown("test");
        orchestrator.shutdown("again");

        assert!(orchestrator.is_shutting_down());
        assert!(orchestrator.open_windows().is_empty());
        assert!(!dir.path().join("scratch/mahall-post-install.html").exists());
        assert!(orchestrator.open_role(WindowRole::Main).is_err());
    }
}
