//! Tracer wrapper script synthesis
//!
//! The wrapper is mounted over the image's entrypoint. It receives the
//! original startup command as its own arguments and `exec`s the tracer
//! with that command as target, so no extra shell lingers in the
//! process tree and the traced workload keeps the tracer's PID.

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::TempPath;

/// In-container path where the wrapper is mounted
pub const WRAPPER_MOUNT_PATH: &str = "/wrapper.sh";

/// In-container path the tracer writes its log to
pub const TRACE_LOG_PATH: &str = "/tmp/strace.log";

/// Default tracer binary inside the instrumented image
pub const DEFAULT_TRACER_PATH: &str = "/usr/bin/strace";

/// How the tracer is invoked inside the instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerSettings {
    pub tracer_path: String,
    pub follow_forks: bool,
    pub log_path: String,
    pub mount_path: String,
}

impl Default for TracerSettings {
    fn default() -> Self {
        Self {
            tracer_path: DEFAULT_TRACER_PATH.to_string(),
            follow_forks: true,
            log_path: TRACE_LOG_PATH.to_string(),
            mount_path: WRAPPER_MOUNT_PATH.to_string(),
        }
    }
}

impl TracerSettings {
    /// Render the strict-mode trampoline script
    pub fn render_script(&self) -> String {
        let fork_flag = if self.follow_forks { " -f" } else { "" };
        format!(
            "#!/bin/bash\n\
             set -euo pipefail\n\
             exec {tracer}{fork_flag} -e trace=file -o {log} \"$@\"\n",
            tracer = self.tracer_path,
            log = self.log_path,
        )
    }
}

/// A wrapper script materialized on the host, ready to be mounted
///
/// The host file is owned by this value. It is deleted by
/// [`TracerWrapper::remove`], or on drop if never removed explicitly.
#[derive(Debug)]
pub struct TracerWrapper {
    script: String,
    host_path: TempPath,
    container_path: String,
    log_path: String,
}

impl TracerWrapper {
    /// Write the script to a uniquely named executable temp file
    pub fn materialize(settings: &TracerSettings) -> std::io::Result<Self> {
        let script = settings.render_script();

        let mut file = tempfile::Builder::new()
            .prefix("strace_wrapper_")
            .suffix(".sh")
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        let host_path = file.into_temp_path();
        fs::set_permissions(&host_path, Permissions::from_mode(0o755))?;
        tracing::debug!(path = %host_path.display(), "created wrapper script");

        Ok(Self {
            script,
            host_path,
            container_path: settings.mount_path.clone(),
            log_path: settings.log_path.clone(),
        })
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    pub fn container_path(&self) -> &str {
        &self.container_path
    }

    pub fn log_path(&self) -> &str {
        &self.log_path
    }

    /// Read-only bind mount of the host script at the container path
    pub fn volume_spec(&self) -> String {
        format!("{}:{}:ro", self.host_path.display(), self.container_path)
    }

    /// Delete the host-side script
    pub fn remove(self) -> std::io::Result<()> {
        self.host_path.close()
    }
}
