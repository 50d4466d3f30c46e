use serde::{Deserialize, Serialize};

/// A parsed Docker tag: `(is_date_based, major, minor, patch, build, suffix)`.
/// Comparable with `Ord`: date-based tuples are always older than semantic
/// ones, and within a family a tuple with no suffix outranks the same
/// numerics with one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTuple {
    pub is_date_based: bool,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
    pub suffix: Option<String>,
}

impl PartialOrd for VersionTuple {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionTuple {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering::*;
        match (self.is_date_based, other.is_date_based) {
            (false, true) => return Greater,
            (true, false) => return Less,
            _ => {}
        }
        let numeric = (self.major, self.minor, self.patch, self.build)
            .cmp(&(other.major, other.minor, other.patch, other.build));
        if numeric != Equal {
            return numeric;
        }
        match (&self.suffix, &other.suffix) {
            (None, None) => Equal,
            (None, Some(_)) => Greater,
            (Some(_), None) => Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

/// The newest tag considered newer than the one currently running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub tag: String,
    pub parsed: VersionTuple,
    pub is_stable: bool,
    pub is_newer: bool,
    pub digest: Option<String>,
}
