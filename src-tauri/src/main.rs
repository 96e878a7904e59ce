#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_runtime;
mod artifact_protocol;
mod desktop_bridge_commands;
mod exit_events;
mod window_actions;

pub(crate) use mahall_lifecycle::logging::{
    append_desktop_log, append_shutdown_log, append_startup_log,
};

fn main() {
    app_runtime::run();
}
