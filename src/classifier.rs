//! Path classification against a static noise policy
//!
//! A path is "ignorable" when it lives under a directory present in
//! virtually every container regardless of workload: device and kernel
//! interfaces, temp and log areas, runtime state, trust stores.

use std::sync::OnceLock;

use crate::parser::FileAccessSet;

/// Built-in prefixes considered universally uninteresting
pub const COMMON_SYSTEM_DIRS: &[&str] = &[
    "/dev",
    "/proc",
    "/sys",
    "/tmp",
    "/var/log",
    "/run",
    "/var/run",
    "/var/tmp",
    "/var/lib",
    "/etc/ssl",
    "/usr/share/ca-certificates",
];

/// Ordered set of path prefixes whose members are ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPolicy {
    prefixes: Vec<String>,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            prefixes: COMMON_SYSTEM_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClassificationPolicy {
    /// Process-wide built-in policy
    pub fn global() -> &'static ClassificationPolicy {
        static POLICY: OnceLock<ClassificationPolicy> = OnceLock::new();
        POLICY.get_or_init(ClassificationPolicy::default)
    }

    /// Built-in table extended with caller-supplied prefixes, order kept
    pub fn with_extra_prefixes<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policy = Self::default();
        for prefix in extra {
            let prefix = prefix.into();
            if !policy.prefixes.contains(&prefix) {
                policy.prefixes.push(prefix);
            }
        }
        policy
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Check whether a path is common system noise
    ///
    /// Relative paths are never ignorable.
    pub fn is_ignorable(&self, path: &str) -> bool {
        if !path.starts_with('/') {
            return false;
        }
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Return the members of `accessed` that are not ignorable
    pub fn filter_accessed_files(&self, accessed: &FileAccessSet) -> FileAccessSet {
        accessed
            .iter()
            .filter(|path| !self.is_ignorable(path))
            .cloned()
            .collect()
    }
}

/// Check a path against the built-in policy
pub fn is_ignorable(path: &str) -> bool {
    ClassificationPolicy::global().is_ignorable(path)
}
