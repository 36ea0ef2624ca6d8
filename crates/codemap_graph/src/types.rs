use codemap_core::{GraphData, ProjectKind};
use std::path::PathBuf;

/// How a scan ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Completed(ScanResult),
    /// Stopped on request; the graph is empty or partial.
    Cancelled(ScanResult),
}

impl ScanOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanOutcome::Cancelled(_))
    }

    pub fn result(&self) -> &ScanResult {
        match self {
            ScanOutcome::Completed(r) | ScanOutcome::Cancelled(r) => r,
        }
    }

    pub fn into_result(self) -> ScanResult {
        match self {
            ScanOutcome::Completed(r) | ScanOutcome::Cancelled(r) => r,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub graph: GraphData,
    /// Every detected project, with the structural analyzer it got (if any)
    pub projects: Vec<(PathBuf, Option<ProjectKind>)>,
    pub files_analyzed: usize,
}
