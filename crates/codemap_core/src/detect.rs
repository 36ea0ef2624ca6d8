use log::{debug, warn};
use std::{fmt, path::Path};

use crate::config::{PackageManifest, read_manifest};

/// Node project shapes that get a structural analyzer of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectKind {
    Backend,
    AppRouter,
    NativeMobile,
    Spa,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Backend => "backend",
            ProjectKind::AppRouter => "app-router",
            ProjectKind::NativeMobile => "native-mobile",
            ProjectKind::Spa => "spa",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const BACKEND_FOLDERS: &[&str] = &["routes", "controllers", "models", "middleware"];
const NEXT_CONFIGS: &[&str] = &["next.config.js", "next.config.mjs", "next.config.ts"];

/// Classifies a node project root.
///
/// `None` means no structural analyzer applies; the project's files are left to
/// the generic pass. An unreadable or malformed manifest also yields `None`.
pub fn classify(project_root: &Path) -> Option<ProjectKind> {
    let manifest = match read_manifest(project_root) {
        Ok(m) => m,
        Err(e) => {
            warn!("Treating {} as unrecognized: {:#}", project_root.display(), e);
            return None;
        }
    };
    let kind = classify_manifest(project_root, &manifest);
    debug!(
        "Classified {} as {}",
        project_root.display(),
        kind.map(|k| k.as_str()).unwrap_or("unrecognized")
    );
    kind
}

/// Decision list, first match wins.
pub fn classify_manifest(project_root: &Path, manifest: &PackageManifest) -> Option<ProjectKind> {
    if manifest.has_dependency("express")
        && (manifest.has_any_dependency("nodemon") || has_backend_folders(project_root))
    {
        return Some(ProjectKind::Backend);
    }

    if manifest.has_dependency("next")
        && (project_root.join("src/app").is_dir()
            || project_root.join("app").is_dir()
            || NEXT_CONFIGS.iter().any(|c| project_root.join(c).is_file()))
    {
        return Some(ProjectKind::AppRouter);
    }

    if manifest.has_dependency("react-native") && project_root.join("app.json").is_file() {
        return Some(ProjectKind::NativeMobile);
    }

    if manifest.has_dependency("react") {
        return Some(ProjectKind::Spa);
    }

    None
}

fn has_backend_folders(project_root: &Path) -> bool {
    [project_root.to_path_buf(), project_root.join("src")]
        .iter()
        .any(|base| BACKEND_FOLDERS.iter().any(|f| base.join(f).is_dir()))
}
