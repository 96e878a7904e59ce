use std::{
    fmt,
    process::{Child, Command, ExitStatus, Stdio},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crate::app_constants::CHILD_POLL_INTERVAL;

/// Ends a process together with its descendants.
pub trait ProcessTerminator: Send + Sync + fmt::Debug {
    fn terminate_tree(&self, pid: u32) -> Result<(), String>;
}

/// `taskkill /t /f`: Windows does not take children down with the parent.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskkillTerminator;

impl ProcessTerminator for TaskkillTerminator {
    fn terminate_tree(&self, pid: u32) -> Result<(), String> {
        let status = Command::new("taskkill")
            .args(["/pid", &pid.to_string(), "/t", "/f"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|error| format!("Failed to run taskkill for pid {pid}: {error}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("taskkill for pid {pid} exited with {status}"))
        }
    }
}

/// Plain `SIGTERM` to the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl ProcessTerminator for SignalTerminator {
    #[cfg(unix)]
    fn terminate_tree(&self, pid: u32) -> Result<(), String> {
        let status = Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|error| format!("Failed to run kill -TERM for pid {pid}: {error}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("kill -TERM {pid} exited with {status}"))
        }
    }

    #[cfg(not(unix))]
    fn terminate_tree(&self, pid: u32) -> Result<(), String> {
        Err(format!("No terminate signal available for pid {pid} on this platform."))
    }
}

pub fn platform_terminator() -> Arc<dyn ProcessTerminator> {
    if cfg!(target_os = "windows") {
        Arc::new(TaskkillTerminator)
    } else {
        Arc::new(SignalTerminator)
    }
}

/// Polls `try_wait` until the child exits or `timeout` elapses.
pub fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(_) => return None,
        }
        if started.elapsed() >= timeout {
            return None;
        }
        thread::sleep(CHILD_POLL_INTERVAL);
    }
}

/// Terminates the child's tree, waits up to `grace`, then kills the child
/// directly. Returns the exit status once reaped.
pub fn stop_child_process<F>(
    child: &mut Child,
    terminator: &dyn ProcessTerminator,
    grace: Duration,
    log: F,
) -> Option<ExitStatus>
where
    F: Fn(&str),
{
    if let Ok(Some(status)) = child.try_wait() {
        return Some(status);
    }

    let pid = child.id();
    if let Err(error) = terminator.terminate_tree(pid) {
        log(&format!("tree termination failed for pid {pid}: {error}"));
    }
    if let Some(status) = wait_with_deadline(child, grace) {
        return Some(status);
    }

    log(&format!(
        "pid {pid} still running after {}ms, killing directly",
        grace.as_millis()
    ));
    if let Err(error) = child.kill() {
        log(&format!("failed to kill pid {pid}: {error}"));
    }
    match child.wait() {
        Ok(status) => Some(status),
        Err(error) => {
            log(&format!("failed to reap pid {pid}: {error}"));
            None
        }
    }
}

pub fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
