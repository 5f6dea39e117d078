//! docktrim configuration
//!
//! Loaded from an optional `docktrim.toml` and overridden by CLI flags.
//!
//! # Example docktrim.toml
//!
//! ```toml
//! tracer_path = "/usr/bin/strace"
//! host_port = 9000
//! readiness_timeout = 30
//! input_text = "Summarize this repository."
//! extra_ignore_prefixes = ["/root/.cache"]
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::classifier::ClassificationPolicy;
use crate::engine::PortMapping;
use crate::invoke::{local_invoke_url, DEFAULT_INPUT_TEXT};
use crate::lifecycle::{LaunchOptions, ReadinessPolicy};
use crate::wrapper::{TracerSettings, DEFAULT_TRACER_PATH, TRACE_LOG_PATH, WRAPPER_MOUNT_PATH};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrimConfig {
    /// Container engine client binary
    pub engine: String,

    /// Tracer binary inside the image
    pub tracer_path: String,
    /// Pass `-f` to the tracer
    pub follow_forks: bool,
    pub trace_log_path: String,
    pub wrapper_mount_path: String,

    /// Container port of the invocation endpoint, e.g. `8080/tcp`
    pub container_port: String,
    pub host_port: u16,

    /// Initial wait before the first status check, seconds
    pub readiness_settle: u64,
    /// Overall readiness deadline, seconds
    pub readiness_timeout: u64,
    /// Status re-poll interval, milliseconds
    pub readiness_poll_interval: u64,

    /// Explicit invocation endpoint; defaults to the emulator on `host_port`
    pub invoke_url: Option<String>,
    pub input_text: String,
    /// Invocation timeout, seconds
    pub invoke_timeout: u64,

    /// Root of the before/after file listings
    pub list_root: String,
    /// Capture before/after listings
    pub snapshot_files: bool,

    /// Prefixes appended to the built-in noise table
    pub extra_ignore_prefixes: Vec<String>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            engine: "docker".to_string(),
            tracer_path: DEFAULT_TRACER_PATH.to_string(),
            follow_forks: true,
            trace_log_path: TRACE_LOG_PATH.to_string(),
            wrapper_mount_path: WRAPPER_MOUNT_PATH.to_string(),
            container_port: "8080/tcp".to_string(),
            host_port: 9000,
            readiness_settle: 5,
            readiness_timeout: 15,
            readiness_poll_interval: 500,
            invoke_url: None,
            input_text: DEFAULT_INPUT_TEXT.to_string(),
            invoke_timeout: 60,
            list_root: "/".to_string(),
            snapshot_files: true,
            extra_ignore_prefixes: Vec::new(),
        }
    }
}

impl TrimConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot produce a working session
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("tracer_path", &self.tracer_path),
            ("trace_log_path", &self.trace_log_path),
            ("wrapper_mount_path", &self.wrapper_mount_path),
            ("list_root", &self.list_root),
        ] {
            if !path.starts_with('/') {
                bail!("{} must be an absolute path, got '{}'", name, path);
            }
        }
        if self.readiness_poll_interval == 0 {
            bail!("readiness_poll_interval must be greater than zero");
        }
        if self.engine.trim().is_empty() {
            bail!("engine must not be empty");
        }
        Ok(())
    }

    pub fn tracer_settings(&self) -> TracerSettings {
        TracerSettings {
            tracer_path: self.tracer_path.clone(),
            follow_forks: self.follow_forks,
            log_path: self.trace_log_path.clone(),
            mount_path: self.wrapper_mount_path.clone(),
        }
    }

    pub fn readiness(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            settle: Duration::from_secs(self.readiness_settle),
            poll_interval: Duration::from_millis(self.readiness_poll_interval),
            timeout: Duration::from_secs(self.readiness_timeout),
        }
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            ports: vec![PortMapping {
                container: self.container_port.clone(),
                host: self.host_port,
            }],
            tty: true,
            readiness: self.readiness(),
        }
    }

    pub fn policy(&self) -> ClassificationPolicy {
        ClassificationPolicy::with_extra_prefixes(self.extra_ignore_prefixes.iter().cloned())
    }

    /// Endpoint the workload is invoked on
    pub fn invoke_url(&self) -> String {
        match &self.invoke_url {
            Some(url) => url.clone(),
            None => local_invoke_url(self.host_port),
        }
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout)
    }
}
