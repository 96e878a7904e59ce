pub mod app_constants;
pub mod app_types;
pub mod artifacts;
pub mod backend_config;
mod backend_output;
pub mod backup_archive;
pub mod commands;
pub mod launch_plan;
pub mod lifecycle;
pub mod logging;
pub mod markers;
pub mod one_shot;
pub mod orchestrator;
pub mod process_control;
pub mod readiness;
pub mod runtime_paths;
pub mod supervisor;
pub mod window_host;

pub use app_types::{AtomicFlagGuard, CommandResult};
pub use artifacts::{ArtifactKind, ArtifactStore, TransientArtifact};
pub use backend_config::{AppEntry, ExecutionMode, ShellConfig};
pub use backup_archive::ValidationError;
pub use launch_plan::LaunchPlan;
pub use lifecycle::{LifecycleState, WindowRole};
pub use markers::{MarkerError, MarkerStore};
pub use orchestrator::LifecycleOrchestrator;
pub use process_control::ProcessTerminator;
pub use supervisor::{BackendSupervisor, SupervisorError};
pub use window_host::{WindowHost, WindowSource};
