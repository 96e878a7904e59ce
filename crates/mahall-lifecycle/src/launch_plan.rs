use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub cmd: String,
    /// Leading arguments placed before the verb, e.g. `manage.py`.
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub envs: Vec<(String, OsString)>,
}

impl LaunchPlan {
    pub fn for_executable(executable: &Path, cwd: PathBuf) -> Self {
        Self {
            cmd: executable.to_string_lossy().to_string(),
            args: Vec::new(),
            cwd,
            envs: Vec::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: impl Into<OsString>) -> Self {
        self.envs.retain(|(existing, _)| existing != key);
        self.envs.push((key.to_string(), value.into()));
        self
    }

    /// Builds the command with piped output and no stdin.
    pub fn command<S: AsRef<str>>(&self, extra_args: &[S]) -> Command {
        let mut command = Command::new(&self.cmd);
        command
            .args(&self.args)
            .args(extra_args.iter().map(AsRef::as_ref))
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("PYTHONUNBUFFERED", "1")
            .envs(self.envs.iter().map(|(key, value)| (key, value)));

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(crate::app_constants::CREATE_NO_WINDOW);
        }

        command
    }

    pub fn debug_command<S: AsRef<str>>(&self, extra_args: &[S]) -> Vec<String> {
        let mut parts = vec![self.cmd.clone()];
        parts.extend(self.args.iter().cloned());
        parts.extend(extra_args.iter().map(|arg| arg.as_ref().to_string()));
        parts
    }
}

pub fn backend_executable_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "django_server.exe"
    } else {
        "django_server"
    }
}

pub fn backup_tool_executable_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "backup_tool.exe"
    } else {
        "backup_tool"
    }
}

pub fn resolve_custom_launch(custom_cmd: &str, cwd: PathBuf) -> Result<LaunchPlan, String> {
    let mut pieces =
        shlex::split(custom_cmd).ok_or_else(|| format!("Invalid backend command: {custom_cmd}"))?;
    if pieces.is_empty() {
        return Err("Backend command is empty.".to_string());
    }

    let cmd = pieces.remove(0);
    Ok(LaunchPlan {
        cmd,
        args: pieces,
        cwd,
        envs: Vec::new(),
    })
}

pub fn resolve_dev_launch(source_root: PathBuf) -> LaunchPlan {
    let python = if cfg!(target_os = "windows") {
        "python"
    } else {
        "python3"
    };
    LaunchPlan {
        cmd: python.to_string(),
        args: vec!["manage.py".to_string()],
        cwd: source_root,
        envs: Vec::new(),
    }
}

pub fn resolve_packaged_launch(resource_dir: &Path) -> LaunchPlan {
    let backend_dir = resource_dir.join("backend");
    LaunchPlan::for_executable(&backend_dir.join(backend_executable_name()), backend_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_custom_launch_splits_quoted_arguments() {
        let plan = resolve_custom_launch(
            r#"python "my scripts/manage.py""#,
            PathBuf::from("/srv/backend"),
        )
        .expect("valid command");

        assert_eq!(plan.cmd, "python");
        assert_eq!(plan.args, vec!["my scripts/manage.py".to_string()]);
        assert_eq!(plan.cwd, PathBuf::from("/srv/backend"));
    }

    #[test]
    fn resolve_custom_launch_rejects_empty_and_unbalanced_commands() {
        assert!(resolve_custom_launch("   ", PathBuf::from(".")).is_err());
        assert!(resolve_custom_launch("python \"manage.py", PathBuf::from(".")).is_err());
    }

    #[test]
    fn debug_command_places_verb_after_leading_args() {
        let plan = resolve_dev_launch(PathBuf::from("/src/backend"));

        let parts = plan.debug_command(&["runserver", "127.0.0.1:8000", "--noreload"]);

        assert_eq!(&parts[1..], ["manage.py", "runserver", "127.0.0.1:8000", "--noreload"]);
    }

    #[test]
    fn packaged_launch_runs_from_backend_resource_dir() {
        let plan = resolve_packaged_launch(Path::new("/opt/mahall/resources"));

        assert_eq!(plan.cwd, PathBuf::from("/opt/mahall/resources/backend"));
        assert!(plan.cmd.ends_with(backend_executable_name()));
        assert!(plan.args.is_empty());
    }

    #[test]
    fn with_env_replaces_existing_key() {
        let plan = resolve_dev_launch(PathBuf::from("."))
            .with_env("APPDATA", "/first")
            .with_env("APPDATA", "/second");

        assert_eq!(
            plan.envs,
            vec![("APPDATA".to_string(), OsString::from("/second"))]
        );
    }
}
