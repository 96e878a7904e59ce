use std::fs;

use mahall_lifecycle::{ArtifactKind, LifecycleOrchestrator};
use tauri::{
    http::{header::CONTENT_TYPE, Request, Response, StatusCode},
    Manager, Runtime, UriSchemeContext,
};
use url::Url;

use crate::append_desktop_log;

pub(crate) const ARTIFACT_SCHEME: &str = "mahall-artifact";

const SERVED_ARTIFACTS: [ArtifactKind; 3] = [
    ArtifactKind::Install,
    ArtifactKind::Loading,
    ArtifactKind::PostInstall,
];

pub(crate) fn artifact_url(file_name: &str) -> Result<Url, String> {
    let raw = if cfg!(any(windows, target_os = "android")) {
        format!("http://{ARTIFACT_SCHEME}.localhost/{file_name}")
    } else {
        format!("{ARTIFACT_SCHEME}://localhost/{file_name}")
    };
    Url::parse(&raw).map_err(|error| format!("Invalid artifact URL {raw}: {error}"))
}

fn requested_artifact(path: &str) -> Option<ArtifactKind> {
    let file_name = path.trim_start_matches('/');
    SERVED_ARTIFACTS
        .into_iter()
        .find(|kind| kind.file_name() == file_name)
}

fn respond(status: StatusCode, content_type: &str, body: Vec<u8>) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .unwrap_or_else(|_| Response::new(Vec::new()))
}

/// Serves materialized page files from the scratch directory. Only the known
/// artifact names are reachable.
pub(crate) fn handle<R: Runtime>(
    context: UriSchemeContext<'_, R>,
    request: Request<Vec<u8>>,
) -> Response<Vec<u8>> {
    let Some(kind) = requested_artifact(request.uri().path()) else {
        return respond(StatusCode::NOT_FOUND, "text/plain", b"not found".to_vec());
    };
    let Some(orchestrator) = context
        .app_handle()
        .try_state::<LifecycleOrchestrator>()
    else {
        return respond(
            StatusCode::SERVICE_UNAVAILABLE,
            "text/plain",
            b"shell is starting".to_vec(),
        );
    };

    let path = orchestrator.config().scratch_dir.join(kind.file_name());
    match fs::read(&path) {
        Ok(bytes) => respond(StatusCode::OK, "text/html; charset=utf-8", bytes),
        Err(error) => {
            append_desktop_log(&format!(
                "failed to serve artifact {}: {error}",
                path.display()
            ));
            respond(StatusCode::NOT_FOUND, "text/plain", b"not found".to_vec())
        }
    }
}
