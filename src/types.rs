use crate::error::ArchiveError;
use std::fmt;
use std::time::Duration;

/// Namespace and name of a pod, as found in the API or in a log directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl PodRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Placeholder for log directories whose name does not follow the
    /// `{namespace}_{pod}_{suffix}` layout. Only used for labeling.
    pub fn unknown() -> Self {
        Self::new("unknown", "unknown")
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Which trigger is archiving, and therefore which files qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivePolicy {
    /// The pod is terminating: every log file is final.
    Event,
    /// Periodic sweep: only rotated or compressed files that have not been
    /// modified for `min_age` and are non-empty.
    Sweep { min_age: Duration },
}

/// Outcome of archiving one pod log directory.
#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub copied: usize,
    pub skipped: usize,
    pub removed: usize,
    pub errors: Vec<ArchiveError>,
}

/// Totals of one sweep pass over the log root.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub directories: usize,
    pub copied: usize,
    pub skipped: usize,
    pub removed: usize,
    pub errors: usize,
}

impl SweepReport {
    pub fn add(&mut self, report: &ArchiveReport) {
        self.directories += 1;
        self.copied += report.copied;
        self.skipped += report.skipped;
        self.removed += report.removed;
        self.errors += report.errors.len();
    }
}
