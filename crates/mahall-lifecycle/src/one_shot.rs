use std::time::{Duration, Instant};

use crate::{
    backend_output::{spawn_line_reader, take_output_streams},
    launch_plan::LaunchPlan,
    logging::append_backend_log,
    process_control::{stop_child_process, wait_with_deadline, ProcessTerminator},
    supervisor::SupervisorError,
};

/// Runs `plan` with `args` to completion. Output is drained into the backend
/// log; a run that outlives `timeout` is force-killed.
pub fn run_one_shot<S: AsRef<str>>(
    plan: &LaunchPlan,
    args: &[S],
    timeout: Duration,
    terminator: &dyn ProcessTerminator,
) -> Result<(), SupervisorError> {
    let command_line = plan.debug_command(args).join(" ");
    append_backend_log(&format!("running one-shot command: {command_line}"));

    let mut child = plan
        .command(args)
        .spawn()
        .map_err(|source| SupervisorError::Spawn {
            command: command_line.clone(),
            source,
        })?;
    let pid = child.id();

    for (stream, reader) in take_output_streams(&mut child) {
        let Some(reader) = reader else {
            continue;
        };
        let on_line = move |line: &str| {
            append_backend_log(&format!("[one-shot {pid} {stream}] {line}"));
        };
        if let Err(error) = spawn_line_reader(format!("one-shot-{stream}-{pid}"), reader, on_line) {
            append_backend_log(&format!(
                "failed to start {stream} reader for pid {pid}: {error}"
            ));
        }
    }

    let started = Instant::now();
    match wait_with_deadline(&mut child, timeout) {
        Some(status) if status.success() => {
            append_backend_log(&format!(
                "one-shot command finished in {}ms: {command_line}",
                started.elapsed().as_millis()
            ));
            Ok(())
        }
        Some(status) => Err(SupervisorError::Exited {
            command: command_line,
            code: status.code(),
        }),
        None => {
            stop_child_process(&mut child, terminator, Duration::ZERO, append_backend_log);
            Err(SupervisorError::Timeout {
                command: command_line,
                timeout,
            })
        }
    }
}
