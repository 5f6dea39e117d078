//! Session report rendering (text and JSON)

use serde::Serialize;
use std::fmt::Write;

use crate::error::Diagnostic;
use crate::invoke::InvocationOutcome;
use crate::lifecycle::InstanceState;
use crate::memory::MemoryUsage;
use crate::reducer::ReductionResult;

/// Everything one session produced
#[derive(Debug, Clone, Serialize)]
pub struct TrimReport {
    pub image: String,
    pub instance_id: String,
    /// Startup command that was re-executed under the tracer
    pub command: Vec<String>,
    pub invocation: InvocationOutcome,
    /// `None` when the invocation failed and the trace was not analyzed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction: Option<ReductionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUsage>,
    /// Instance logs captured when the invocation failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_logs: Option<String>,
    pub final_state: Option<InstanceState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TrimReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Image: {}", self.image)?;
        writeln!(out, "Container: {}", self.instance_id)?;
        writeln!(out, "Wrapped command: {:?}", self.command)?;
        writeln!(out, "Invocation status: {}", self.invocation.status)?;
        writeln!(out)?;

        match &self.reduction {
            Some(reduction) => {
                writeln!(out, "--- Files Accessed by Workload (Filtered) ---")?;
                for path in &reduction.relevant_accesses {
                    writeln!(out, "{}", path)?;
                }
                writeln!(
                    out,
                    "Total filtered unique file accesses: {} (of {} raw)",
                    reduction.relevant_accesses.len(),
                    reduction.raw_access_count
                )?;

                if let Some(delta) = &reduction.file_delta {
                    writeln!(out)?;
                    writeln!(out, "--- Filesystem Changes ---")?;
                    for path in &delta.added {
                        writeln!(out, "+ {}", path)?;
                    }
                    for path in &delta.deleted {
                        writeln!(out, "- {}", path)?;
                    }
                    writeln!(
                        out,
                        "Added: {}, deleted: {}",
                        delta.added.len(),
                        delta.deleted.len()
                    )?;
                }
            }
            None => {
                writeln!(out, "Invocation failed; trace log not analyzed.")?;
                if let Some(logs) = &self.container_logs {
                    writeln!(out, "--- Container logs ---")?;
                    writeln!(out, "{}", logs.trim_end())?;
                }
            }
        }

        writeln!(out)?;
        writeln!(out, "--- Memory Usage ---")?;
        match &self.memory {
            Some(memory) => {
                let pct = memory
                    .usage_pct
                    .map(|p| format!("{:.2}%", p))
                    .unwrap_or_else(|| "unknown".to_string());
                let limit = memory
                    .memory_limit_bytes
                    .filter(|l| *l > 0)
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "unlimited".to_string());
                writeln!(
                    out,
                    "Usage: {} bytes, limit: {}, percent: {}",
                    memory.memory_usage_bytes, limit, pct
                )?;
            }
            None => writeln!(out, "unavailable")?,
        }

        if !self.diagnostics.is_empty() {
            writeln!(out)?;
            writeln!(out, "--- Diagnostics ---")?;
            for diag in &self.diagnostics {
                writeln!(out, "{}", diag)?;
            }
        }
        Ok(())
    }
}
