//! Container engine capability
//!
//! The lifecycle manager only talks to an engine through
//! [`ContainerEngine`], so tests can substitute an in-memory fake.
//! [`DockerCli`] drives the `docker` command-line client (or any
//! CLI-compatible engine such as `podman`).

use serde::Deserialize;
use std::process::{Command, Output};
use thiserror::Error;

use crate::command::ImageConfig;

/// Errors reported by a container engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Image or container does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine ran but refused the request
    #[error("`{command}` failed with status {status}: {stderr}")]
    Rejected {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The engine client could not be spawned at all
    #[error("Failed to run engine client: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Failed to decode engine output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected engine output: {0}")]
    Parse(String),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound(_))
    }
}

/// Host port published for a container port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Container side, e.g. `8080/tcp`
    pub container: String,
    pub host: u16,
}

/// Everything needed to create and start one instrumented instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub entrypoint: String,
    pub args: Vec<String>,
    pub ports: Vec<PortMapping>,
    /// Bind mounts in `host:container[:mode]` form
    pub volumes: Vec<String>,
    pub tty: bool,
}

/// Exit code and combined output of a command run inside an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub output: Vec<u8>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Point-in-time memory figures for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub usage_bytes: u64,
    /// Configured limit; `None` or `Some(0)` means unlimited
    pub limit_bytes: Option<u64>,
}

/// Image inspection capability
pub trait ImageInspector {
    /// Declared entrypoint and default command of an image
    fn inspect_image(&self, image: &str) -> Result<ImageConfig, EngineError>;
}

/// Container primitives used by the lifecycle manager
pub trait ContainerEngine: ImageInspector {
    /// Create an instance without starting it, returning its id
    fn create(&self, spec: &RunSpec) -> Result<String, EngineError>;

    /// Start a created instance
    fn start(&self, id: &str) -> Result<(), EngineError>;

    /// Current status string (`created`, `running`, `exited`, ...)
    fn status(&self, id: &str) -> Result<String, EngineError>;

    /// Combined stdout/stderr of the instance
    fn logs(&self, id: &str) -> Result<String, EngineError>;

    /// Run a command inside the instance
    fn exec(&self, id: &str, argv: &[String]) -> Result<ExecOutput, EngineError>;

    fn stop(&self, id: &str) -> Result<(), EngineError>;

    /// Forced removal
    fn remove(&self, id: &str) -> Result<(), EngineError>;

    fn memory_stats(&self, id: &str) -> Result<MemoryStats, EngineError>;
}

/// Engine backed by the `docker` command-line client
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn output(&self, args: &[String]) -> Result<Output, EngineError> {
        tracing::debug!(binary = %self.binary, ?args, "engine call");
        Ok(Command::new(&self.binary).args(args).output()?)
    }

    /// Run a client command that must succeed, returning trimmed stdout
    fn checked(&self, args: &[String]) -> Result<String, EngineError> {
        let output = self.output(args)?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_not_found_message(&stderr) {
            return Err(EngineError::NotFound(stderr));
        }
        Err(EngineError::Rejected {
            command: format!("{} {}", self.binary, args.join(" ")),
            status: output.status.code().unwrap_or(-1),
            stderr,
        })
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn is_not_found_message(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("no such container")
        || lower.contains("no such image")
        || lower.contains("no such object")
}

/// Client arguments for `docker create`
///
/// Creation and start are separate calls so the id of an instance that
/// fails to start is still known and can be removed.
pub fn create_args(spec: &RunSpec) -> Vec<String> {
    let mut args = owned(&["create"]);
    if spec.tty {
        args.push("--tty".to_string());
    }
    args.push("--entrypoint".to_string());
    args.push(spec.entrypoint.clone());
    for port in &spec.ports {
        args.push("--publish".to_string());
        args.push(format!("{}:{}", port.host, port.container));
    }
    for volume in &spec.volumes {
        args.push("--volume".to_string());
        args.push(volume.clone());
    }
    args.push(spec.image.clone());
    args.extend(spec.args.iter().cloned());
    args
}

impl ImageInspector for DockerCli {
    fn inspect_image(&self, image: &str) -> Result<ImageConfig, EngineError> {
        let raw = self.checked(&owned(&["image", "inspect", "--format", "{{json .Config}}", image]))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Deserialize)]
struct StatsLine {
    #[serde(rename = "MemUsage")]
    mem_usage: String,
}

impl ContainerEngine for DockerCli {
    fn create(&self, spec: &RunSpec) -> Result<String, EngineError> {
        let id = self.checked(&create_args(spec))?;
        if id.is_empty() {
            return Err(EngineError::Parse("engine returned no container id".to_string()));
        }
        Ok(id)
    }

    fn start(&self, id: &str) -> Result<(), EngineError> {
        self.checked(&owned(&["start", id])).map(|_| ())
    }

    fn status(&self, id: &str) -> Result<String, EngineError> {
        self.checked(&owned(&["inspect", "--format", "{{.State.Status}}", id]))
    }

    fn logs(&self, id: &str) -> Result<String, EngineError> {
        let output = self.output(&owned(&["logs", id]))?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() && is_not_found_message(&text) {
            return Err(EngineError::NotFound(text.trim().to_string()));
        }
        Ok(text)
    }

    fn exec(&self, id: &str, argv: &[String]) -> Result<ExecOutput, EngineError> {
        let mut args = owned(&["exec", id]);
        args.extend(argv.iter().cloned());
        let output = self.output(&args)?;
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }

    fn stop(&self, id: &str) -> Result<(), EngineError> {
        self.checked(&owned(&["stop", id])).map(|_| ())
    }

    fn remove(&self, id: &str) -> Result<(), EngineError> {
        self.checked(&owned(&["rm", "--force", id])).map(|_| ())
    }

    fn memory_stats(&self, id: &str) -> Result<MemoryStats, EngineError> {
        let raw = self.checked(&owned(&["stats", "--no-stream", "--format", "{{json .}}", id]))?;
        let line: StatsLine = serde_json::from_str(&raw)?;
        parse_mem_usage(&line.mem_usage)
    }
}

/// Parse a `MemUsage` field such as `12.5MiB / 1.944GiB`
///
/// The right-hand side is the limit the engine applies, which is the
/// host's memory when no explicit limit was set. A missing or zero limit
/// yields `None`.
pub fn parse_mem_usage(field: &str) -> Result<MemoryStats, EngineError> {
    let (usage, limit) = match field.split_once('/') {
        Some((usage, limit)) => (usage, Some(limit)),
        None => (field, None),
    };

    let usage_bytes = parse_byte_size(usage)?;
    let limit_bytes = match limit.map(str::trim) {
        Some(limit) if !limit.is_empty() => Some(parse_byte_size(limit)?).filter(|&l| l > 0),
        _ => None,
    };

    Ok(MemoryStats {
        usage_bytes,
        limit_bytes,
    })
}

/// Parse a human-readable byte size (`512B`, `1.5KiB`, `3MB`, ...)
pub fn parse_byte_size(text: &str) -> Result<u64, EngineError> {
    let text = text.trim();
    let split = text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| EngineError::Parse(format!("invalid size '{}'", text)))?;

    let multiplier: f64 = match unit.trim() {
        "" | "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "kB" | "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        other => return Err(EngineError::Parse(format!("unknown size unit '{}'", other))),
    };

    Ok((value * multiplier).round() as u64)
}
