use dashmap::DashMap;
use log::trace;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    cancel::CancellationToken,
    config::read_tsconfig_paths,
    constants::{DEFAULT_ALIAS_PREFIX, DEFAULT_IGNORES, PROJECT_MARKERS},
    extractor::{ExtractorStrategy, ImportExtractor, LocalFilter, build_extractor},
    types::{Ecosystem, Project},
};

/// Caller-supplied knobs for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Exact file/directory names never descended into.
    pub ignore: Vec<String>,
    pub alias_prefix: String,
    pub strategy: ExtractorStrategy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ignore: DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect(),
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            strategy: ExtractorStrategy::default(),
        }
    }
}

/// State owned by a single scan and threaded through every analyzer.
///
/// Nothing here outlives the scan, so two scans over different roots never
/// see each other's cached lookups.
#[derive(Debug)]
pub struct ScanContext {
    pub root: PathBuf,
    pub options: ScanOptions,
    pub cancel: CancellationToken,
    tsconfig: DashMap<PathBuf, Arc<HashMap<String, Vec<String>>>>,
}

impl ScanContext {
    pub fn new(root: impl Into<PathBuf>, options: ScanOptions, cancel: CancellationToken) -> Self {
        Self { root: root.into(), options, cancel, tsconfig: DashMap::new() }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// tsconfig/jsconfig path aliases of a project, loaded once per scan.
    pub fn tsconfig_paths(&self, project_root: &Path) -> Arc<HashMap<String, Vec<String>>> {
        if let Some(paths) = self.tsconfig.get(project_root) {
            return Arc::clone(&paths);
        }
        let paths = Arc::new(read_tsconfig_paths(project_root));
        self.tsconfig.insert(project_root.to_path_buf(), Arc::clone(&paths));
        paths
    }

    /// An extractor configured for files of the given project.
    pub fn extractor_for(
        &self,
        project_root: &Path,
        ecosystem: Option<Ecosystem>,
    ) -> Box<dyn ImportExtractor> {
        let aliases = self.tsconfig_paths(project_root);
        let filter =
            LocalFilter::new(self.options.alias_prefix.clone()).with_aliases(aliases.keys().cloned());
        build_extractor(self.options.strategy, filter, ecosystem)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.options.ignore.iter().any(|i| i == name)
    }
}

/// Detected projects plus a memoized nearest-project-root lookup.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    projects: BTreeMap<PathBuf, Project>,
    roots: DashMap<PathBuf, PathBuf>,
}

impl ProjectIndex {
    pub fn new(projects: Vec<Project>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.root.clone(), p)).collect(),
            roots: DashMap::new(),
        }
    }

    pub fn get(&self, root: &Path) -> Option<&Project> {
        self.projects.get(root)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Nearest enclosing project of `file`, if it lies inside a detected one.
    pub fn project_for(&self, file: &Path) -> Option<&Project> {
        let root = self.root_for(file);
        self.projects.get(&root)
    }

    /// Walks up from the file's directory to the first directory that is a
    /// detected project or holds a manifest marker.
    ///
    /// Without any, the starting directory itself is returned.
    pub fn root_for(&self, file: &Path) -> PathBuf {
        let start = if file.is_dir() { file } else { file.parent().unwrap_or(file) };
        if let Some(root) = self.roots.get(start) {
            return root.clone();
        }

        let root = start
            .ancestors()
            .find(|dir| self.projects.contains_key(*dir) || has_marker(dir))
            .unwrap_or(start)
            .to_path_buf();
        trace!("Project root for {} is {}", start.display(), root.display());
        self.roots.insert(start.to_path_buf(), root.clone());
        root
    }
}

fn has_marker(dir: &Path) -> bool {
    PROJECT_MARKERS.iter().any(|(marker, _)| dir.join(marker).is_file())
}
