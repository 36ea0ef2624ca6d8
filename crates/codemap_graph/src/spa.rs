//! Single-page apps: pages found by the `*page.*` naming convention, each
//! attached to a layout when one can be identified.

use log::{debug, warn};
use regex::Regex;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use codemap_core::{
    COMPONENT_EXTENSIONS, GraphData, GraphLink, GraphNode, LinkKind, NodeId, NodeKind,
    PackageManifest, ScanContext, list_dir, read_files, read_manifest,
};

use crate::builder::{GraphBuilder, Placement, file_name};

/// Flavour of a UI-library project, decided from its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaVariant {
    /// Browser app with pages under `src/pages`
    Web,
    /// Meta-framework app; layouts follow directory nesting
    Meta,
    /// React Native screens
    Mobile,
}

impl SpaVariant {
    pub fn detect(project_root: &Path, manifest: &PackageManifest) -> Option<Self> {
        let has_app_dir = project_root.join("src/app").is_dir() || project_root.join("app").is_dir();
        if manifest.has_dependency("react-native") && project_root.join("app.json").is_file() {
            Some(SpaVariant::Mobile)
        } else if manifest.has_dependency("next")
            && (project_root.join("next.config.js").is_file() || has_app_dir)
        {
            Some(SpaVariant::Meta)
        } else if manifest.has_dependency("react") {
            Some(SpaVariant::Web)
        } else {
            None
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            SpaVariant::Web => "react",
            SpaVariant::Meta => "nextjs",
            SpaVariant::Mobile => "react-native",
        }
    }

    pub fn app_name(&self) -> &'static str {
        match self {
            SpaVariant::Web => "React Application",
            SpaVariant::Meta => "Next.js Application",
            SpaVariant::Mobile => "React Native Application",
        }
    }

    fn page_dirs(&self) -> &'static [&'static str] {
        match self {
            SpaVariant::Web => &["src/pages"],
            SpaVariant::Meta => &["src/app", "app", "pages", "src/pages"],
            SpaVariant::Mobile => &["screens"],
        }
    }
}

fn regex_page_file() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)page\.(jsx?|tsx?)$").expect("valid regex literal"))
}

const LAYOUT_FILES: &[&str] = &["layout.tsx", "layout.jsx", "layout.js"];

pub fn analyze_spa(ctx: &ScanContext, project_root: &Path) -> GraphData {
    let manifest = match read_manifest(project_root) {
        Ok(m) => m,
        Err(e) => {
            warn!("Skipping single-page analysis of {}: {:#}", project_root.display(), e);
            return GraphData::default();
        }
    };
    let Some(variant) = SpaVariant::detect(project_root, &manifest) else {
        debug!("{} has no UI library dependency", project_root.display());
        return GraphData::default();
    };
    debug!("Analyzing {} as {} project", project_root.display(), variant.tag());

    let mut builder = GraphBuilder::new(ctx, project_root, variant.tag(), COMPONENT_EXTENSIONS);
    let app_id = NodeId::Key(format!("{}-{}", variant.tag(), project_root.display()));
    builder.add_node(
        GraphNode::new(app_id.clone(), variant.app_name(), NodeKind::Application)
            .with_visuals(0, 30),
    );

    let mut page_paths = Vec::new();
    for dir in variant.page_dirs() {
        collect_pages(ctx, &project_root.join(dir), &mut page_paths);
    }
    if page_paths.is_empty() {
        debug!("No pages found under {}", project_root.display());
        return builder.finish();
    }

    let pages: Vec<(PathBuf, String)> = read_files(&page_paths, &ctx.cancel)
        .into_iter()
        .filter_map(|(path, content)| content.map(|c| (path, c)))
        .collect();

    // Layouts go first so pages can attach to them
    let mut page_layouts = Vec::with_capacity(pages.len());
    let mut layout_paths = BTreeSet::new();
    for (path, content) in &pages {
        let layout = match variant {
            SpaVariant::Meta => layout_by_proximity(path, project_root),
            SpaVariant::Web | SpaVariant::Mobile => layout_by_import(&builder, path, content),
        };
        if let Some(layout) = &layout {
            layout_paths.insert(layout.clone());
        }
        page_layouts.push(layout);
    }

    let layout_paths: Vec<PathBuf> = layout_paths.into_iter().collect();
    for (path, content) in read_files(&layout_paths, &ctx.cancel) {
        let Some(content) = content else {
            continue;
        };
        let id = NodeId::Path(path.clone());
        let placement = builder.add_node(file_node(&path, &content, NodeKind::Layout));
        builder.add_link(GraphLink::structural(id.clone(), app_id.clone(), LinkKind::LayoutStructure));
        if placement == Placement::New {
            builder.pull_dependencies(&id, &path, &content, &component_node);
        }
    }

    for ((path, content), layout) in pages.iter().zip(page_layouts) {
        if ctx.is_cancelled() {
            break;
        }
        let id = NodeId::Path(path.clone());
        let placement = builder.add_node(file_node(path, content, NodeKind::Page));
        if placement == Placement::Kept {
            continue;
        }

        let link = match layout.map(NodeId::Path).filter(|l| builder.contains(l)) {
            Some(layout_id) => GraphLink::structural(id.clone(), layout_id, LinkKind::UsesLayout),
            None => GraphLink::reference(id.clone(), app_id.clone(), LinkKind::Route),
        };
        builder.add_link(link);
        if placement == Placement::New {
            builder.pull_dependencies(&id, path, content, &component_node);
        }
    }

    builder.finish()
}

/// At most one page per directory, recursing into every non-private child.
fn collect_pages(ctx: &ScanContext, dir: &Path, out: &mut Vec<PathBuf>) {
    if ctx.is_cancelled() {
        return;
    }
    // Missing page directories are the common case, not an error
    let Ok(items) = list_dir(dir) else {
        return;
    };

    if let Some(page) = items.iter().find(|i| !i.is_dir && regex_page_file().is_match(&i.name)) {
        out.push(page.path.clone());
    }

    for item in items.iter().filter(|i| i.is_dir) {
        if item.name.starts_with('_') || item.name.starts_with('.') || ctx.is_ignored(&item.name) {
            continue;
        }
        collect_pages(ctx, &item.path, out);
    }
}

/// Nearest `layout.*` walking up from the page, staying inside an app
/// directory.
fn layout_by_proximity(page: &Path, project_root: &Path) -> Option<PathBuf> {
    let dir = page.parent()?;
    let relative = dir.strip_prefix(project_root).ok()?;
    if !relative.components().any(|c| c.as_os_str() == "app") {
        return None;
    }

    for ancestor in dir.ancestors() {
        if !ancestor.starts_with(project_root)
            || !ancestor.strip_prefix(project_root).ok()?.components().any(|c| c.as_os_str() == "app")
        {
            break;
        }
        if let Some(found) = LAYOUT_FILES.iter().map(|f| ancestor.join(f)).find(|p| p.is_file()) {
            return Some(found);
        }
    }
    None
}

/// First import whose last path segment names a layout, e.g.
/// `../layouts/MainLayout`.
fn layout_by_import(builder: &GraphBuilder<'_>, page: &Path, content: &str) -> Option<PathBuf> {
    builder
        .extractor()
        .extract(content)
        .into_iter()
        .filter(|spec| {
            spec.request
                .rsplit('/')
                .next()
                .is_some_and(|last| last.to_ascii_lowercase().contains("layout"))
        })
        .find_map(|spec| builder.resolve(&spec.request, page))
}

fn file_node(path: &Path, content: &str, kind: NodeKind) -> GraphNode {
    let (group, radius) = match kind {
        NodeKind::Page => (1, 15),
        NodeKind::Layout => (2, 20),
        _ => (3, 10),
    };
    GraphNode::new(NodeId::Path(path.to_path_buf()), file_name(path), kind)
        .with_content(content)
        .with_visuals(group, radius)
}

fn component_node(path: &Path, content: &str) -> GraphNode {
    file_node(path, content, NodeKind::Component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_core::{CancellationToken, ScanOptions};
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn scan(root: &Path) -> GraphData {
        let ctx = ScanContext::new(root, ScanOptions::default(), CancellationToken::new());
        analyze_spa(&ctx, root)
    }

    #[test]
    fn test_web_pages_with_imported_layout() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "dependencies": { "react": "18" } }"#);
        let home = create_test_file(
            root,
            "src/pages/home/HomePage.tsx",
            "import MainLayout from '../../layouts/MainLayout';\nimport Card from '../../components/Card';",
        );
        let about = create_test_file(root, "src/pages/about/AboutPage.jsx", "export default () => null;");
        let layout = create_test_file(root, "src/layouts/MainLayout.tsx", "");
        let card = create_test_file(root, "src/components/Card.tsx", "");

        let graph = scan(root);
        let app = &graph.nodes[0];
        assert_eq!(app.kind, NodeKind::Application);
        assert_eq!(app.name, "React Application");
        assert_eq!(app.project.as_deref(), Some("react"));

        // layout first, then pages in discovery order
        assert_eq!(graph.nodes[1].id, NodeId::Path(layout.clone()));
        assert_eq!(graph.nodes[1].kind, NodeKind::Layout);

        let link_from = |path: &Path, kind: LinkKind| {
            graph
                .links
                .iter()
                .find(|l| l.source == NodeId::Path(path.to_path_buf()) && l.kind == kind)
                .map(|l| l.target.clone())
        };
        assert_eq!(link_from(&home, LinkKind::UsesLayout), Some(NodeId::Path(layout.clone())));
        assert_eq!(link_from(&about, LinkKind::Route), Some(app.id.clone()));
        assert_eq!(link_from(&layout, LinkKind::LayoutStructure), Some(app.id.clone()));

        let card_node = graph.nodes.iter().find(|n| n.id == NodeId::Path(card.clone())).unwrap();
        assert_eq!(card_node.kind, NodeKind::Component);
        assert!(
            graph
                .links
                .iter()
                .any(|l| l.source == NodeId::Path(home.clone()) && l.target == NodeId::Path(card.clone()))
        );
    }

    #[test]
    fn test_meta_variant_finds_layout_by_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "dependencies": { "next": "14", "react": "18" } }"#);
        let layout = create_test_file(root, "app/layout.tsx", "");
        let page = create_test_file(root, "app/dashboard/page.tsx", "");

        let graph = scan(root);
        assert_eq!(graph.nodes[0].name, "Next.js Application");
        let uses = graph.links.iter().find(|l| l.kind == LinkKind::UsesLayout).unwrap();
        assert_eq!(uses.source, NodeId::Path(page));
        assert_eq!(uses.target, NodeId::Path(layout));
        assert_eq!(uses.value, 2);
    }

    #[test]
    fn test_unrecognized_manifest_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "dependencies": { "vue": "3" } }"#);
        assert!(scan(root).is_empty());

        create_test_file(root, "package.json", "not json");
        assert!(scan(root).is_empty());
    }
}
