//! Instrumented instance lifecycle
//!
//! State machine: `created -> running -> {ready | failed} -> stopped -> removed`.
//!
//! An [`InstanceLifecycle`] owns exactly one instance and one wrapper
//! file. Teardown runs every sub-step regardless of earlier failures and
//! also runs on drop, so a session that errors or panics after creation
//! still ends with the instance removed and the wrapper deleted.

use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::command::StartupCommand;
use crate::engine::{ContainerEngine, PortMapping, RunSpec};
use crate::error::{Diagnostic, DiagnosticKind, Result, TrimError};
use crate::memory::MemoryUsage;
use crate::reducer::{parse_file_listing, FileListing};
use crate::wrapper::TracerWrapper;

/// Lifecycle state of an instrumented instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Created,
    Running,
    Ready,
    Failed,
    Stopped,
    Removed,
}

/// Handle to an instance created by this lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstance {
    pub id: String,
    pub state: InstanceState,
}

/// Bounded readiness wait
///
/// The instance is first given `settle` to start. A transitional status
/// (`created`, `restarting`) is then re-polled every `poll_interval`
/// until `timeout` has elapsed since creation. Any other non-running
/// status fails immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub settle: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(15),
        }
    }
}

/// How the instance is launched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub ports: Vec<PortMapping>,
    pub tty: bool,
    pub readiness: ReadinessPolicy,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            ports: vec![PortMapping {
                container: "8080/tcp".to_string(),
                host: 9000,
            }],
            tty: true,
            readiness: ReadinessPolicy::default(),
        }
    }
}

const RUNNING: &str = "running";

fn is_transitional(status: &str) -> bool {
    matches!(status, "created" | "restarting")
}

pub struct InstanceLifecycle<'e> {
    engine: &'e dyn ContainerEngine,
    wrapper: Option<TracerWrapper>,
    instance: Option<ContainerInstance>,
    diagnostics: Vec<Diagnostic>,
    torn_down: bool,
}

impl<'e> InstanceLifecycle<'e> {
    pub fn new(engine: &'e dyn ContainerEngine) -> Self {
        Self {
            engine,
            wrapper: None,
            instance: None,
            diagnostics: Vec::new(),
            torn_down: false,
        }
    }

    pub fn instance(&self) -> Option<&ContainerInstance> {
        self.instance.as_ref()
    }

    /// Current state, `None` before an instance was created
    pub fn state(&self) -> Option<InstanceState> {
        self.instance.as_ref().map(|i| i.state)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn set_state(&mut self, state: InstanceState) {
        if let Some(instance) = self.instance.as_mut() {
            tracing::debug!(id = %instance.id, from = ?instance.state, to = ?state, "instance transition");
            instance.state = state;
        }
    }

    fn record(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warn(kind, message));
    }

    /// Create the instrumented instance and wait until it is ready
    ///
    /// The wrapper is taken over by this lifecycle even when startup
    /// fails, so [`cleanup`](Self::cleanup) always deletes it.
    pub fn start(
        &mut self,
        image: &str,
        wrapper: TracerWrapper,
        command: StartupCommand,
        options: &LaunchOptions,
    ) -> Result<ContainerInstance> {
        let spec = RunSpec {
            image: image.to_string(),
            entrypoint: wrapper.container_path().to_string(),
            args: command.into_args(),
            ports: options.ports.clone(),
            volumes: vec![wrapper.volume_spec()],
            tty: options.tty,
        };
        self.wrapper = Some(wrapper);

        let started_at = Instant::now();
        let id = self.engine.create(&spec).map_err(|e| {
            let message = if e.is_not_found() {
                format!("Image '{}' not found", image)
            } else {
                format!("Error creating container from '{}'", image)
            };
            TrimError::startup(message, e)
        })?;
        tracing::info!(id = %id, image, "container created");

        // Recorded before start so cleanup removes it if start fails
        self.instance = Some(ContainerInstance {
            id: id.clone(),
            state: InstanceState::Created,
        });

        if let Err(e) = self.engine.start(&id) {
            self.set_state(InstanceState::Failed);
            return Err(TrimError::startup(
                format!("Error starting container {} from '{}'", id, image),
                e,
            ));
        }
        tracing::info!(id = %id, "container started");

        self.await_ready(&id, started_at, options.readiness)?;
        Ok(ContainerInstance {
            id,
            state: InstanceState::Ready,
        })
    }

    fn await_ready(&mut self, id: &str, started_at: Instant, policy: ReadinessPolicy) -> Result<()> {
        thread::sleep(policy.settle);
        let deadline = started_at + policy.timeout.max(policy.settle);

        let status = loop {
            let status = match self.engine.status(id) {
                Ok(status) => status,
                Err(e) => format!("unknown ({})", e),
            };
            if status == RUNNING || !is_transitional(&status) || Instant::now() >= deadline {
                break status;
            }
            thread::sleep(policy.poll_interval);
        };

        if status == RUNNING {
            self.set_state(InstanceState::Running);
            self.set_state(InstanceState::Ready);
            tracing::info!(id = %id, "container ready");
            return Ok(());
        }

        let logs = match self.engine.logs(id) {
            Ok(logs) => logs,
            Err(e) => format!("Could not retrieve container logs: {}", e),
        };
        tracing::error!(id = %id, status = %status, "container failed to start");
        tracing::error!("container logs on startup failure:\n{}", logs);
        self.set_state(InstanceState::Failed);

        Err(TrimError::NotReady {
            instance: id.to_string(),
            status,
            logs,
            diagnostics: Vec::new(),
        })
    }

    fn instance_id(&self) -> Option<String> {
        self.instance.as_ref().map(|i| i.id.clone())
    }

    /// Combined logs of the instance, for diagnosis
    pub fn container_logs(&mut self) -> Option<String> {
        let id = self.instance_id()?;
        match self.engine.logs(&id) {
            Ok(logs) => Some(logs),
            Err(e) => {
                self.record(
                    DiagnosticKind::RetrievalWarning,
                    format!("Could not retrieve logs of {}: {}", id, e),
                );
                None
            }
        }
    }

    /// Read the tracer log from inside the instance
    ///
    /// A missing or unreadable log yields an empty string plus a
    /// diagnostic: no accesses observed.
    pub fn retrieve_trace_log(&mut self) -> String {
        let Some(id) = self.instance_id() else {
            return String::new();
        };
        let log_path = self
            .wrapper
            .as_ref()
            .map(|w| w.log_path().to_string())
            .unwrap_or_else(|| crate::wrapper::TRACE_LOG_PATH.to_string());

        let argv = vec!["cat".to_string(), log_path.clone()];
        match self.engine.exec(&id, &argv) {
            Ok(out) if out.success() => {
                let text = out.text();
                tracing::info!(bytes = text.len(), "retrieved trace log");
                text
            }
            Ok(out) => {
                self.record(
                    DiagnosticKind::RetrievalWarning,
                    format!(
                        "Error retrieving trace log from {} (exit code {}): {}",
                        log_path,
                        out.exit_code,
                        out.text().trim()
                    ),
                );
                String::new()
            }
            Err(e) => {
                self.record(
                    DiagnosticKind::RetrievalWarning,
                    format!("Exception retrieving trace log: {}", e),
                );
                String::new()
            }
        }
    }

    /// Enumerate regular files under `root` inside the instance
    pub fn list_files(&mut self, root: &str) -> FileListing {
        let Some(id) = self.instance_id() else {
            return FileListing::new();
        };

        let argv = vec![
            "find".to_string(),
            root.to_string(),
            "-type".to_string(),
            "f".to_string(),
        ];
        match self.engine.exec(&id, &argv) {
            Ok(out) if out.success() => {
                let listing = parse_file_listing(&out.text());
                tracing::info!(root, files = listing.len(), "listed container files");
                listing
            }
            Ok(out) => {
                self.record(
                    DiagnosticKind::RetrievalWarning,
                    format!(
                        "Error listing files at {} (exit code {}): {}",
                        root,
                        out.exit_code,
                        out.text().trim()
                    ),
                );
                FileListing::new()
            }
            Err(e) => {
                self.record(
                    DiagnosticKind::RetrievalWarning,
                    format!("Exception listing files at {}: {}", root, e),
                );
                FileListing::new()
            }
        }
    }

    /// Point-in-time memory usage, `None` with a diagnostic on failure
    pub fn memory_usage(&mut self) -> Option<MemoryUsage> {
        let id = self.instance_id()?;
        match self.engine.memory_stats(&id) {
            Ok(stats) => Some(MemoryUsage::from_stats(stats)),
            Err(e) => {
                self.record(
                    DiagnosticKind::RetrievalWarning,
                    format!("Could not read memory stats of {}: {}", id, e),
                );
                None
            }
        }
    }

    /// Stop the instance; an instance that is already gone counts as stopped
    pub fn stop(&mut self) {
        let Some(id) = self.instance_id() else { return };
        tracing::info!(id = %id, "stopping container");
        match self.engine.stop(&id) {
            Ok(()) => self.set_state(InstanceState::Stopped),
            Err(e) if e.is_not_found() => {
                tracing::info!(id = %id, "container already gone during stop");
                self.set_state(InstanceState::Stopped);
            }
            Err(e) => self.record(
                DiagnosticKind::TeardownWarning,
                format!("Error stopping container {}: {}", id, e),
            ),
        }
    }

    /// Force-remove the instance; an instance that is already gone counts as removed
    pub fn remove(&mut self) {
        let Some(id) = self.instance_id() else { return };
        tracing::info!(id = %id, "removing container");
        match self.engine.remove(&id) {
            Ok(()) => self.set_state(InstanceState::Removed),
            Err(e) if e.is_not_found() => {
                tracing::info!(id = %id, "container already gone during remove");
                self.set_state(InstanceState::Removed);
            }
            Err(e) => self.record(
                DiagnosticKind::TeardownWarning,
                format!("Error removing container {}: {}", id, e),
            ),
        }
    }

    fn delete_wrapper(&mut self) {
        let Some(wrapper) = self.wrapper.take() else { return };
        let path = wrapper.host_path().display().to_string();
        match wrapper.remove() {
            Ok(()) => tracing::info!(path = %path, "cleaned up wrapper script"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.record(
                DiagnosticKind::TeardownWarning,
                format!("Error cleaning up wrapper script {}: {}", path, e),
            ),
        }
    }

    /// Stop, remove, then delete the wrapper; runs at most once
    ///
    /// Every step is attempted regardless of the outcome of the previous
    /// ones. Returns the teardown diagnostics recorded by this call.
    pub fn cleanup(&mut self) -> Vec<Diagnostic> {
        if self.torn_down {
            return Vec::new();
        }
        self.torn_down = true;

        let before = self.diagnostics.len();
        self.stop();
        self.remove();
        self.delete_wrapper();
        self.diagnostics[before..].to_vec()
    }
}

impl Drop for InstanceLifecycle<'_> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
