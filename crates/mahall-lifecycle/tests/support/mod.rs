#![allow(dead_code)]

use std::{
    fs,
    io::{Read, Write},
    net::TcpListener,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use mahall_lifecycle::{
    process_control::SignalTerminator, AppEntry, ExecutionMode, LaunchPlan, LifecycleOrchestrator,
    ShellConfig, WindowHost, WindowRole, WindowSource,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Open(WindowRole, WindowSource),
    Navigate(WindowRole, WindowSource),
    Close(WindowRole),
    Focus(WindowRole),
}

#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    failing_navigations: AtomicUsize,
}

impl RecordingHost {
    /// The next `count` navigations fail and are not recorded.
    pub fn fail_next_navigations(&self, count: usize) {
        self.failing_navigations.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn opened_roles(&self) -> Vec<WindowRole> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Open(role, _) => Some(role),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> Vec<(WindowRole, WindowSource)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Navigate(role, source) => Some((role, source)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().expect("calls").push(call);
    }
}

impl WindowHost for RecordingHost {
    fn open_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String> {
        self.record(HostCall::Open(role, source.clone()));
        Ok(())
    }

    fn navigate_window(&self, role: WindowRole, source: &WindowSource) -> Result<(), String> {
        let failing = self
            .failing_navigations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if failing.is_ok() {
            return Err("webview is not ready".to_string());
        }
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

/// A backend that understands `runserver` and `migrate`, the latter exiting
/// with `migrate_exit`.
pub fn fake_backend_script(migrate_exit: i32) -> String {
    format!(
        r#"case "$1" in
  runserver) echo "Starting development server at http://$2/"; exec sleep 30 ;;
  migrate) echo "Applying migrations"; [ {migrate_exit} -ne 0 ] && echo "migration broke" >&2; exit {migrate_exit} ;;
  *) echo "unknown verb $1" >&2; exit 2 ;;
esac"#
    )
}

pub fn sh_plan(script: &str, cwd: &Path) -> LaunchPlan {
    LaunchPlan {
        cmd: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "backend".to_string()],
        cwd: cwd.to_path_buf(),
        envs: Vec::new(),
    }
}

/// Writes an executable shell script standing in for the backup tool.
pub fn write_tool_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("backup_tool");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write tool script");
    let mut permissions = fs::metadata(&path).expect("tool metadata").permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).expect("chmod tool script");
    path
}

pub fn write_zip_archive(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"PK\x03\x04mahall-backup").expect("write archive");
    path
}

/// Answers every request with `status_line` until the test process exits.
pub fn serve_status(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
    let url = format!("http://{}/", listener.local_addr().expect("addr"));
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            let mut buffer = [0_u8; 2048];
            let _ = stream.read(&mut buffer);
            let _ = write!(
                stream,
                "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
            );
        }
    });
    url
}

pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/", listener.local_addr().expect("addr"));
    drop(listener);
    url
}

pub fn test_config(root: &Path, mode: ExecutionMode, backend_launch: LaunchPlan) -> ShellConfig {
    ShellConfig {
        mode,
        data_root: root.join("data"),
        scratch_dir: root.join("scratch"),
        backend_bind: "127.0.0.1:8000".to_string(),
        backend_url: refused_url(),
        backend_launch,
        backup_tool: root.join("no-such-dir").join("backup_tool"),
        app_entry: match mode {
            ExecutionMode::Development => AppEntry::DevServer(
                url::Url::parse("http://localhost:5174/").expect("dev server url"),
            ),
            ExecutionMode::Production => AppEntry::Bundled("index.html".to_string()),
        },
        migration_timeout: Duration::from_secs(10),
        backup_timeout: Duration::from_secs(10),
        ready_settle: Duration::from_millis(50),
        ready_poll_interval: Duration::from_millis(50),
        ready_probe_timeout: Duration::from_millis(500),
    }
}

pub fn orchestrator_with(config: ShellConfig) -> (LifecycleOrchestrator, Arc<RecordingHost>) {
    let host = Arc::new(RecordingHost::default());
    let orchestrator = LifecycleOrchestrator::with_terminator(
        config,
        Arc::clone(&host) as Arc<dyn WindowHost>,
        Arc::new(SignalTerminator),
    );
    (orchestrator, host)
}

pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

pub fn pid_is_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
