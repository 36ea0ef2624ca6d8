use ignore::{DirEntry, Walk, WalkBuilder};
use log::{debug, trace, warn};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    cancel::CancellationToken,
    constants::{ALWAYS_SKIPPED_DIRS, PROJECT_MARKERS, READ_BATCH_SIZE, SOURCE_EXTENSIONS},
    types::Project,
};

/// Whether a directory entry name is excluded from every walk.
pub fn is_skipped(name: &str, is_dir: bool, ignore: &[String]) -> bool {
    ignore.iter().any(|i| i == name) || (is_dir && ALWAYS_SKIPPED_DIRS.contains(&name))
}

fn walker(root: &Path, ignore: &[String]) -> Walk {
    let ignore = ignore.to_vec();
    // Exact-name ignores only; .gitignore files do not shape the graph
    WalkBuilder::new(root)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry: &DirEntry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let name = entry.file_name().to_string_lossy();
            !is_skipped(&name, is_dir, &ignore)
        })
        .build()
}

/// Finds every directory under `root` holding a recognized manifest.
///
/// A directory with several markers is reported once, tagged by the first
/// marker in [`PROJECT_MARKERS`] order. Results are sorted by root.
pub fn detect_projects(
    root: &Path,
    ignore: &[String],
    cancel: &CancellationToken,
) -> Vec<Project> {
    debug!("Detecting projects under {}", root.display());
    let mut by_root: BTreeMap<PathBuf, (usize, Project)> = BTreeMap::new();

    for res in walker(root, ignore) {
        if cancel.is_cancelled() {
            debug!("Project detection cancelled");
            break;
        }
        let dent = match res {
            Ok(d) => d,
            Err(e) => {
                warn!("Skipping unreadable entry during project detection: {}", e);
                continue;
            }
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let name = dent.file_name().to_string_lossy();
        let Some(priority) = PROJECT_MARKERS.iter().position(|(marker, _)| *marker == name) else {
            continue;
        };
        let Some(dir) = dent.path().parent() else {
            continue;
        };

        let project = Project {
            root: dir.to_path_buf(),
            manifest: dent.path().to_path_buf(),
            ecosystem: PROJECT_MARKERS[priority].1,
        };
        trace!("Found {} manifest at {}", project.ecosystem, project.manifest.display());

        match by_root.get(dir) {
            Some((existing, _)) if *existing <= priority => {}
            _ => {
                by_root.insert(dir.to_path_buf(), (priority, project));
            }
        }
    }

    let projects: Vec<Project> = by_root.into_values().map(|(_, p)| p).collect();
    debug!("Detected {} projects", projects.len());
    projects
}

/// Enumerates source-like files under `root` in deterministic (sorted walk)
/// order.
pub fn collect_source_files(
    root: &Path,
    ignore: &[String],
    cancel: &CancellationToken,
) -> Vec<PathBuf> {
    debug!("Collecting source files under {}", root.display());
    let mut files = Vec::new();

    for res in walker(root, ignore) {
        if cancel.is_cancelled() {
            debug!("File collection cancelled");
            return Vec::new();
        }
        let dent = match res {
            Ok(d) => d,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let p = dent.path();
        if let Some(ext) = p.extension().and_then(|e| e.to_str())
            && SOURCE_EXTENSIONS.contains(&ext)
        {
            trace!("Found source file: {}", p.display());
            files.push(p.to_path_buf());
        }
    }

    debug!("Collected {} source files", files.len());
    files
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirItem {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

/// Lists a directory sorted by name.
pub fn list_dir(dir: &Path) -> io::Result<Vec<DirItem>> {
    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        items.push(DirItem {
            path: entry.path(),
            name: entry.file_name().to_string_lossy().to_string(),
            is_dir,
        });
    }
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

/// Reads files concurrently, at most [`READ_BATCH_SIZE`] in flight, returning
/// results in input order. Unreadable files come back as `None`.
pub fn read_files(paths: &[PathBuf], cancel: &CancellationToken) -> Vec<(PathBuf, Option<String>)> {
    let mut out = Vec::with_capacity(paths.len());
    for batch in paths.chunks(READ_BATCH_SIZE) {
        if cancel.is_cancelled() {
            break;
        }
        let contents: Vec<(PathBuf, Option<String>)> = batch
            .par_iter()
            .map(|p| match fs::read_to_string(p) {
                Ok(c) => (p.clone(), Some(c)),
                Err(e) => {
                    warn!("Error reading file {}: {}", p.display(), e);
                    (p.clone(), None)
                }
            })
            .collect();
        out.extend(contents);
    }
    out
}
