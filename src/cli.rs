//! CLI argument parsing for docktrim

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::TrimConfig;

/// Output format for the session report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "docktrim")]
#[command(version)]
#[command(
    about = "Trace the files a container workload touches during one real invocation",
    long_about = None
)]
pub struct Cli {
    /// Image to instrument (e.g. docker-image:test)
    #[arg(value_name = "IMAGE")]
    pub image: String,

    /// Load settings from a TOML file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Container engine client binary (docker, podman, ...)
    #[arg(long, value_name = "BIN")]
    pub engine: Option<String>,

    /// Text sent to the workload as `input_text`
    #[arg(long = "input-text", value_name = "TEXT")]
    pub input_text: Option<String>,

    /// Invocation endpoint URL
    #[arg(long = "invoke-url", value_name = "URL")]
    pub invoke_url: Option<String>,

    /// Host port published for the invocation endpoint
    #[arg(long = "host-port", value_name = "PORT")]
    pub host_port: Option<u16>,

    /// Container port of the invocation endpoint (e.g. 8080/tcp)
    #[arg(long = "container-port", value_name = "PORT")]
    pub container_port: Option<String>,

    /// Readiness deadline in seconds
    #[arg(long = "readiness-timeout", value_name = "SECS")]
    pub readiness_timeout: Option<u64>,

    /// Root directory of the before/after file listings
    #[arg(long = "list-root", value_name = "DIR")]
    pub list_root: Option<String>,

    /// Skip the before/after file listings
    #[arg(long = "no-snapshot")]
    pub no_snapshot: bool,

    /// Additional path prefix to treat as noise (repeatable)
    #[arg(long = "ignore-prefix", value_name = "PREFIX")]
    pub ignore_prefix: Vec<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Overlay command-line values onto a loaded configuration
    pub fn apply_to(&self, config: &mut TrimConfig) {
        if let Some(engine) = &self.engine {
            config.engine = engine.clone();
        }
        if let Some(text) = &self.input_text {
            config.input_text = text.clone();
        }
        if let Some(url) = &self.invoke_url {
            config.invoke_url = Some(url.clone());
        }
        if let Some(port) = self.host_port {
            config.host_port = port;
        }
        if let Some(port) = &self.container_port {
            config.container_port = port.clone();
        }
        if let Some(timeout) = self.readiness_timeout {
            config.readiness_timeout = timeout;
        }
        if let Some(root) = &self.list_root {
            config.list_root = root.clone();
        }
        if self.no_snapshot {
            config.snapshot_files = false;
        }
        config
            .extra_ignore_prefixes
            .extend(self.ignore_prefix.iter().cloned());
    }
}
