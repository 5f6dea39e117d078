//! docktrim - find the files a containerized workload actually touches
//!
//! This library wraps an image's original startup command with a
//! syscall tracer, runs one instrumented instance, and reduces the trace
//! to the set of workload-relevant file paths, the raw material for a
//! trimmed container image.

pub mod classifier;
pub mod cli;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod invoke;
pub mod lifecycle;
pub mod memory;
pub mod parser;
pub mod reducer;
pub mod report;
pub mod rewriter;
pub mod session;
pub mod wrapper;

pub use error::{Diagnostic, DiagnosticKind, Result, TrimError};
