//! Access-log parser for strace `-e trace=file` output
//!
//! Turns raw trace text into the set of paths named by file-related
//! syscalls. Every line is matched independently; lines that do not
//! match are skipped, never reported as errors.
//!
//! The match is deliberately lenient: a recognized syscall name may
//! appear anywhere on the line and the *first* quoted string after it is
//! taken as the path. On lines carrying several quoted strings this can
//! pick an argument that is not the path.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// File-related syscalls whose quoted argument is recorded
pub const FILE_ACCESS_SYSCALLS: &[&str] = &[
    "openat",
    "open",
    "access",
    "stat",
    "faccessat",
    "lstat",
    "newfstatat",
    "fstat",
    "readlinkat",
    "readlink",
    "statx",
];

/// Set of normalized absolute paths extracted from trace text
pub type FileAccessSet = BTreeSet<String>;

/// Recognized syscall name followed by its first quoted argument
static ACCESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = FILE_ACCESS_SYSCALLS.join("|");
    Regex::new(&format!(r#"({alternation}).*?"(.*?)""#)).expect("access regex is valid")
});

/// Extract the path referenced on a single trace line, if any
pub fn parse_line(line: &str) -> Option<&str> {
    let caps = ACCESS_REGEX.captures(line)?;
    let path = caps.get(2)?.as_str();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Parse a full trace log into its file-access set
pub fn parse_file_accesses(log: &str) -> FileAccessSet {
    let accesses: FileAccessSet = log
        .lines()
        .filter_map(parse_line)
        .map(str::to_string)
        .collect();
    tracing::debug!(paths = accesses.len(), "parsed trace log");
    accesses
}
