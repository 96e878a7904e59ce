use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use reqwest::{blocking::Client, redirect::Policy};

use crate::logging::append_desktop_log;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready(u16),
    NotReady(String),
}

/// Any answer below 500 proves the server is listening; a 404 on the base
/// URL is expected.
pub fn is_ready_status(status: u16) -> bool {
    (200..500).contains(&status)
}

pub struct ReadinessProbe {
    client: Client,
    url: String,
}

impl ReadinessProbe {
    /// Must not be constructed or dropped on an async runtime thread.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(request_timeout)
            .redirect(Policy::none())
            .no_proxy()
            .build()
            .map_err(|error| format!("Failed to build readiness probe client: {error}"))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn probe_once(&self) -> ProbeOutcome {
        match self.client.get(&self.url).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                if is_ready_status(status) {
                    ProbeOutcome::Ready(status)
                } else {
                    ProbeOutcome::NotReady(format!("status {status}"))
                }
            }
            Err(error) => ProbeOutcome::NotReady(error.to_string()),
        }
    }

    /// Polls every `interval` until a ready status arrives or `cancel` is set.
    /// Returns the ready status, or `None` when cancelled.
    pub fn poll_until_ready(&self, interval: Duration, cancel: &AtomicBool) -> Option<u16> {
        let mut attempts: u64 = 0;
        loop {
            if cancel.load(Ordering::Acquire) {
                append_desktop_log(&format!(
                    "readiness probe for {} cancelled after {attempts} attempts",
                    self.url
                ));
                return None;
            }

            attempts += 1;
            match self.probe_once() {
                ProbeOutcome::Ready(status) => {
                    append_desktop_log(&format!(
                        "backend reachable at {} (status {status}) after {attempts} attempts",
                        self.url
                    ));
                    return Some(status);
                }
                ProbeOutcome::NotReady(reason) => {
                    if attempts == 1 {
                        append_desktop_log(&format!(
                            "backend not reachable yet at {}: {reason}",
                            self.url
                        ));
                    }
                }
            }
            thread::sleep(interval);
        }
    }
}

/// Runs a probe on its own thread; `on_ready` fires at most once.
pub fn spawn_readiness_probe<F>(
    url: String,
    interval: Duration,
    request_timeout: Duration,
    cancel: Arc<AtomicBool>,
    on_ready: F,
) -> std::io::Result<thread::JoinHandle<()>>
where
    F: FnOnce(u16) + Send + 'static,
{
    thread::Builder::new()
        .name("backend-readiness-probe".to_string())
        .spawn(move || {
            let probe = match ReadinessProbe::new(url, request_timeout) {
                Ok(probe) => probe,
                Err(error) => {
                    append_desktop_log(&error);
                    return;
                }
            };
            if let Some(status) = probe.poll_until_ready(interval, &cancel) {
                if !cancel.load(Ordering::Acquire) {
                    on_ready(status);
                }
            }
        })
}
