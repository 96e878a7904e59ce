use std::{
    io,
    process::Child,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
    thread,
    time::Duration,
};

use crate::{
    app_constants::{BACKEND_MONITOR_INTERVAL, NORELOAD_FLAG, RUNSERVER_VERB, STOP_GRACE_PERIOD},
    backend_config::ExecutionMode,
    backend_output::{contains_ready_marker, spawn_line_reader, take_output_streams},
    launch_plan::LaunchPlan,
    logging::{append_backend_log, append_shutdown_log},
    one_shot,
    process_control::{describe_exit_code, stop_child_process, ProcessTerminator},
};

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` did not finish within {}ms and was killed", .timeout.as_millis())]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` failed with {}", describe_exit_code(.code))]
    Exited { command: String, code: Option<i32> },
}

type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
struct BackendHandle {
    child: Child,
    pid: u32,
    generation: u64,
    exit_code: Option<Option<i32>>,
}

impl BackendHandle {
    /// Records the exit code the first time the process is seen exited.
    fn poll_exit(&mut self) -> Option<Option<i32>> {
        if self.exit_code.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit_code = Some(status.code());
            }
        }
        self.exit_code
    }
}

#[derive(Debug)]
struct SupervisorInner {
    mode: ExecutionMode,
    launch: LaunchPlan,
    bind: String,
    ready_settle: Duration,
    terminator: Arc<dyn ProcessTerminator>,
    handle: Mutex<Option<BackendHandle>>,
    lifecycle_lock: Mutex<()>,
    generation: AtomicU64,
    shut_down: AtomicBool,
}

impl SupervisorInner {
    fn lock_handle(&self) -> MutexGuard<'_, Option<BackendHandle>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        let mut guard = self.lock_handle();
        match guard.as_mut() {
            Some(handle) if handle.generation == generation => handle.poll_exit().is_none(),
            _ => false,
        }
    }
}

/// Owns the single long-running backend process.
#[derive(Debug, Clone)]
pub struct BackendSupervisor {
    inner: Arc<SupervisorInner>,
}

impl BackendSupervisor {
    pub fn new(
        mode: ExecutionMode,
        launch: LaunchPlan,
        bind: impl Into<String>,
        ready_settle: Duration,
        terminator: Arc<dyn ProcessTerminator>,
    ) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                mode,
                launch,
                bind: bind.into(),
                ready_settle,
                terminator,
                handle: Mutex::new(None),
                lifecycle_lock: Mutex::new(()),
                generation: AtomicU64::new(0),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.inner.mode
    }

    pub fn launch_plan(&self) -> &LaunchPlan {
        &self.inner.launch
    }

    pub fn terminator(&self) -> &dyn ProcessTerminator {
        self.inner.terminator.as_ref()
    }

    /// Starts the backend server. `on_ready` runs once, after a readiness
    /// line appeared and the settle delay passed. In development the backend
    /// is managed externally and `on_ready` runs immediately.
    ///
    /// After [`shutdown`](Self::shutdown) this is a logged no-op.
    pub fn start<F>(&self, on_ready: F) -> Result<(), SupervisorError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.refuse_after_shutdown() {
            return Ok(());
        }
        if self.inner.mode.is_development() {
            append_backend_log("development mode: backend is managed externally");
            on_ready();
            return Ok(());
        }

        let _lifecycle = self
            .inner
            .lifecycle_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Checked again under the lock: a shutdown may have run while we waited.
        if self.refuse_after_shutdown() {
            return Ok(());
        }
        let mut guard = self.inner.lock_handle();
        if let Some(handle) = guard.as_mut() {
            match handle.poll_exit() {
                None => {
                    append_backend_log(&format!(
                        "backend already running (pid {}), start skipped",
                        handle.pid
                    ));
                    return Ok(());
                }
                Some(code) => {
                    append_backend_log(&format!(
                        "discarding exited backend handle (pid {}, {})",
                        handle.pid,
                        describe_exit_code(&code)
                    ));
                    *guard = None;
                }
            }
        }

        let args = [RUNSERVER_VERB, self.inner.bind.as_str(), NORELOAD_FLAG];
        let command_line = self.inner.launch.debug_command(&args).join(" ");
        let mut child = match self.inner.launch.command(&args).spawn() {
            Ok(child) => child,
            Err(source) => {
                append_backend_log(&format!(
                    "failed to spawn backend `{command_line}`: {source}"
                ));
                return Err(SupervisorError::Spawn {
                    command: command_line,
                    source,
                });
            }
        };
        let pid = child.id();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        append_backend_log(&format!("backend started (pid {pid}): {command_line}"));

        let ready_callback: Arc<Mutex<Option<ReadyCallback>>> =
            Arc::new(Mutex::new(Some(Box::new(on_ready))));
        for (stream, reader) in take_output_streams(&mut child) {
            let Some(reader) = reader else {
                continue;
            };
            let weak = Arc::downgrade(&self.inner);
            let ready_callback = Arc::clone(&ready_callback);
            let on_line = move |line: &str| {
                append_backend_log(&format!("[{stream}] {line}"));
                if contains_ready_marker(line) {
                    schedule_ready(&weak, &ready_callback, generation);
                }
            };
            if let Err(error) = spawn_line_reader(format!("backend-{stream}-{pid}"), reader, on_line)
            {
                append_backend_log(&format!("failed to start backend {stream} reader: {error}"));
            }
        }

        *guard = Some(BackendHandle {
            child,
            pid,
            generation,
            exit_code: None,
        });
        drop(guard);

        spawn_exit_monitor(Arc::downgrade(&self.inner), pid, generation);
        Ok(())
    }

    /// Runs the backend with a single administrative verb and waits for it.
    pub fn run_one_shot(&self, verb: &str, timeout: Duration) -> Result<(), SupervisorError> {
        one_shot::run_one_shot(
            &self.inner.launch,
            &[verb],
            timeout,
            self.inner.terminator.as_ref(),
        )
    }

    /// Terminates the backend tree and clears the handle. No-op when nothing
    /// is running.
    pub fn stop(&self) {
        let _lifecycle = self
            .inner
            .lifecycle_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(mut handle) = self.inner.lock_handle().take() else {
            return;
        };

        if let Some(code) = handle.poll_exit() {
            append_shutdown_log(&format!(
                "backend (pid {}) had already exited with {}",
                handle.pid,
                describe_exit_code(&code)
            ));
            return;
        }

        append_shutdown_log(&format!("stopping backend (pid {})", handle.pid));
        match stop_child_process(
            &mut handle.child,
            self.inner.terminator.as_ref(),
            STOP_GRACE_PERIOD,
            append_shutdown_log,
        ) {
            Some(status) => append_shutdown_log(&format!(
                "backend (pid {}) stopped with {}",
                handle.pid,
                describe_exit_code(&status.code())
            )),
            None => append_shutdown_log(&format!(
                "backend (pid {}) could not be confirmed stopped",
                handle.pid
            )),
        }
    }

    /// Stops the backend for good. Any later `start`, including the one at
    /// the end of [`restart_after`](Self::restart_after), is refused.
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        self.stop();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    fn refuse_after_shutdown(&self) -> bool {
        if !self.is_shut_down() {
            return false;
        }
        append_backend_log("backend start refused: host is shutting down");
        true
    }

    /// Stops a running backend around `action` and starts it again afterwards.
    /// Nothing is restarted when the backend was not running beforehand.
    pub fn restart_after<T>(&self, action: impl FnOnce() -> T) -> T {
        let was_running = self.is_running();
        if was_running {
            append_backend_log("stopping backend for exclusive data access");
            self.stop();
        }

        let result = action();

        if was_running {
            if let Err(error) =
                self.start(|| append_backend_log("backend ready again after exclusive action"))
            {
                append_backend_log(&format!("failed to restart backend: {error}"));
            }
        }
        result
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .lock_handle()
            .as_mut()
            .is_some_and(|handle| handle.poll_exit().is_none())
    }

    pub fn current_pid(&self) -> Option<u32> {
        self.inner.lock_handle().as_ref().map(|handle| handle.pid)
    }

    /// Exit code of the current handle once its process has exited.
    pub fn exit_code(&self) -> Option<Option<i32>> {
        self.inner
            .lock_handle()
            .as_mut()
            .and_then(BackendHandle::poll_exit)
    }
}

fn schedule_ready(
    weak: &Weak<SupervisorInner>,
    ready_callback: &Arc<Mutex<Option<ReadyCallback>>>,
    generation: u64,
) {
    let Some(callback) = ready_callback
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
    else {
        return;
    };
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let settle = inner.ready_settle;
    drop(inner);

    append_backend_log(&format!(
        "backend readiness line observed, settling for {}ms",
        settle.as_millis()
    ));
    let weak = weak.clone();
    let spawned = thread::Builder::new()
        .name("backend-ready-settle".to_string())
        .spawn(move || {
            thread::sleep(settle);
            match weak.upgrade() {
                Some(inner) if inner.is_current(generation) => {
                    drop(inner);
                    callback();
                }
                _ => append_backend_log("backend stopped before readiness settled; ready skipped"),
            }
        });
    if let Err(error) = spawned {
        append_backend_log(&format!("failed to schedule backend ready callback: {error}"));
    }
}

fn spawn_exit_monitor(weak: Weak<SupervisorInner>, pid: u32, generation: u64) {
    let spawned = thread::Builder::new()
        .name(format!("backend-monitor-{pid}"))
        .spawn(move || loop {
            thread::sleep(BACKEND_MONITOR_INTERVAL);
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut guard = inner.lock_handle();
            let Some(handle) = guard.as_mut().filter(|handle| handle.generation == generation)
            else {
                return;
            };
            if let Some(code) = handle.poll_exit() {
                append_backend_log(&format!(
                    "backend (pid {pid}) exited unexpectedly with {}; not restarting",
                    describe_exit_code(&code)
                ));
                return;
            }
        });
    if let Err(error) = spawned {
        append_backend_log(&format!("failed to start backend exit monitor: {error}"));
    }
}
