//! Set reduction from raw evidence to the relevant-access set
//!
//! This is the single transformation path from raw trace text to the
//! final file list: the trace is parsed, then every path matching the
//! classification policy is dropped. Callers hand raw evidence to
//! [`Reducer`] rather than driving the parser and classifier themselves.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::classifier::ClassificationPolicy;
use crate::parser::{self, FileAccessSet};

/// Snapshot of the regular files present in an instance
pub type FileListing = BTreeSet<String>;

/// Paths that appeared and disappeared between two listings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileDelta {
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl FileDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

/// Outcome of reducing one session's evidence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReductionResult {
    /// Number of distinct paths in the trace before filtering
    pub raw_access_count: usize,
    /// Accessed paths surviving the classification policy
    pub relevant_accesses: FileAccessSet,
    /// Before/after listing comparison, when both listings exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_delta: Option<FileDelta>,
}

/// Pure set difference between two listings
pub fn compare_file_sets(before: &FileListing, after: &FileListing) -> FileDelta {
    FileDelta {
        added: after.difference(before).cloned().collect(),
        deleted: before.difference(after).cloned().collect(),
    }
}

/// Turn `find <root> -type f` output into a listing, dropping blank lines
pub fn parse_file_listing(raw: &str) -> FileListing {
    raw.lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drives the parser and classifier for one policy
#[derive(Debug, Clone, Default)]
pub struct Reducer {
    policy: ClassificationPolicy,
}

impl Reducer {
    pub fn new(policy: ClassificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    /// Parse raw trace text and keep only workload-relevant paths
    pub fn relevant_accesses(&self, trace_text: &str) -> FileAccessSet {
        let raw = parser::parse_file_accesses(trace_text);
        self.policy.filter_accessed_files(&raw)
    }

    /// Reduce trace text and optional listings to a single result
    pub fn reduce(
        &self,
        trace_text: &str,
        before: Option<&FileListing>,
        after: Option<&FileListing>,
    ) -> ReductionResult {
        let raw = parser::parse_file_accesses(trace_text);
        let relevant_accesses = self.policy.filter_accessed_files(&raw);
        tracing::info!(
            raw = raw.len(),
            relevant = relevant_accesses.len(),
            "reduced file accesses"
        );

        let file_delta = match (before, after) {
            (Some(before), Some(after)) => Some(compare_file_sets(before, after)),
            _ => None,
        };

        ReductionResult {
            raw_access_count: raw.len(),
            relevant_accesses,
            file_delta,
        }
    }
}
