use anyhow::{Result, bail};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    thread,
};

use codemap_core::{
    CancellationToken, Ecosystem, GraphData, NodeId, ProjectIndex, ProjectKind, ScanContext,
    ScanOptions, classify, detect_projects,
};

use crate::{
    app_router::analyze_app_router,
    backend::analyze_backend,
    generic::analyze_generic,
    graph::assemble,
    mobile::analyze_mobile,
    spa::analyze_spa,
    types::{ScanOutcome, ScanResult},
};

/// Runs the structural analyzer matching `kind` on one project.
pub fn analyze_project(ctx: &ScanContext, project_root: &Path, kind: ProjectKind) -> GraphData {
    match kind {
        ProjectKind::Backend => analyze_backend(ctx, project_root),
        ProjectKind::AppRouter => analyze_app_router(ctx, project_root),
        ProjectKind::NativeMobile => analyze_mobile(ctx, project_root),
        ProjectKind::Spa => analyze_spa(ctx, project_root),
    }
}

/// Scans `root` and returns the merged dependency graph.
///
/// Only a missing or non-directory root is an error. Everything below it
/// that cannot be read just contributes nothing.
pub fn run_scan(root: &Path, options: ScanOptions, cancel: CancellationToken) -> Result<ScanOutcome> {
    if !root.exists() {
        bail!("Scan root {} does not exist", root.display());
    }
    if !root.is_dir() {
        bail!("Scan root {} is not a directory", root.display());
    }
    info!("Starting scan of {}", root.display());

    // Everything memoized lives in this context and dies with the scan
    let ctx = ScanContext::new(root, options, cancel);
    if ctx.is_cancelled() {
        info!("Scan cancelled before start");
        return Ok(ScanOutcome::Cancelled(ScanResult::default()));
    }

    info!("Detecting projects");
    let projects = ProjectIndex::new(detect_projects(root, &ctx.options.ignore, &ctx.cancel));
    info!("Found {} projects", projects.len());
    if ctx.is_cancelled() {
        return Ok(ScanOutcome::Cancelled(ScanResult::default()));
    }

    let classified: Vec<(PathBuf, Option<ProjectKind>)> = projects
        .projects()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|p| {
            let kind = match p.ecosystem {
                Ecosystem::Node => classify(&p.root),
                _ => None,
            };
            (p.root.clone(), kind)
        })
        .collect();

    info!("Running structural analyzers");
    let structural: Vec<GraphData> = classified
        .par_iter()
        .filter_map(|(project_root, kind)| {
            let kind = (*kind)?;
            debug!(
                "Thread {:?} analyzing {} as {}",
                thread::current().id(),
                project_root.display(),
                kind
            );
            Some(analyze_project(&ctx, project_root, kind))
        })
        .collect();

    let claimed: HashSet<PathBuf> = structural
        .iter()
        .flat_map(|g| g.nodes.iter())
        .filter_map(|n| n.id.as_path().map(Path::to_path_buf))
        .collect();
    debug!("Structural analyzers claimed {} files", claimed.len());

    if ctx.is_cancelled() {
        warn!("Scan cancelled after structural analysis");
        return Ok(ScanOutcome::Cancelled(finish(structural, classified)));
    }

    info!("Running generic dependency analysis");
    let generic = analyze_generic(&ctx, &projects, &claimed);

    let mut parts = structural;
    parts.push(generic);
    let result = finish(parts, classified);

    if ctx.is_cancelled() {
        warn!("Scan cancelled during generic analysis");
        return Ok(ScanOutcome::Cancelled(result));
    }
    info!("Scan complete");
    Ok(ScanOutcome::Completed(result))
}

fn finish(parts: Vec<GraphData>, projects: Vec<(PathBuf, Option<ProjectKind>)>) -> ScanResult {
    let graph = assemble(parts);
    let files_analyzed = graph
        .nodes
        .iter()
        .filter(|n| matches!(n.id, NodeId::Path(_) | NodeId::Index(_)))
        .count();
    ScanResult { graph, projects, files_analyzed }
}
