//! Language-agnostic file graph for everything the structural analyzers did
//! not claim.

use log::{debug, info};
use rayon::prelude::*;
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use codemap_core::{
    Ecosystem, GENERIC_EXTENSIONS, GraphData, GraphLink, GraphNode, ImportExtractor, LinkKind,
    NodeId, NodeKind, ProjectIndex, Resolver, ScanContext, collect_source_files, content_radius,
    read_files,
};

/// Visual group by ecosystem and file extension.
pub fn generic_group(ecosystem: Option<Ecosystem>, ext: &str) -> u32 {
    match ecosystem {
        Some(Ecosystem::Node) => match ext {
            "js" | "jsx" => 1,
            "ts" | "tsx" => 2,
            "json" => 3,
            _ => 9,
        },
        Some(Ecosystem::Php) => 8,
        Some(Ecosystem::Java) => 7,
        Some(Ecosystem::Python) => 5,
        _ => {
            if ext == "md" {
                3
            } else {
                9
            }
        }
    }
}

struct SourceFile {
    path: PathBuf,
    content: String,
    project_root: PathBuf,
    ecosystem: Option<Ecosystem>,
}

/// Builds the index-keyed graph of every unclaimed source file under the scan
/// root.
///
/// Node ids are dense indices in discovery order; only edges between two
/// scanned, unclaimed files survive.
pub fn analyze_generic(
    ctx: &ScanContext,
    projects: &ProjectIndex,
    claimed: &HashSet<PathBuf>,
) -> GraphData {
    let candidates: Vec<PathBuf> = collect_source_files(&ctx.root, &ctx.options.ignore, &ctx.cancel)
        .into_iter()
        .filter(|p| !claimed.contains(p))
        .collect();
    if ctx.is_cancelled() {
        return GraphData::default();
    }
    info!("Generic pass over {} unclaimed files", candidates.len());

    let files: Vec<SourceFile> = read_files(&candidates, &ctx.cancel)
        .into_iter()
        .filter_map(|(path, content)| {
            let content = content.filter(|c| !c.trim().is_empty())?;
            let project_root = projects.root_for(&path);
            let ecosystem = projects.get(&project_root).map(|p| p.ecosystem);
            Some(SourceFile { path, content, project_root, ecosystem })
        })
        .collect();

    let index: HashMap<&Path, usize> =
        files.iter().enumerate().map(|(i, f)| (f.path.as_path(), i)).collect();

    let mut extractors: HashMap<(&Path, Option<Ecosystem>), Box<dyn ImportExtractor>> = HashMap::new();
    let mut tsconfig: HashMap<&Path, Arc<HashMap<String, Vec<String>>>> = HashMap::new();
    for file in &files {
        extractors
            .entry((file.project_root.as_path(), file.ecosystem))
            .or_insert_with(|| ctx.extractor_for(&file.project_root, file.ecosystem));
        tsconfig
            .entry(file.project_root.as_path())
            .or_insert_with(|| ctx.tsconfig_paths(&file.project_root));
    }

    let resolver = Resolver::new(ctx.options.alias_prefix.clone(), GENERIC_EXTENSIONS);
    let links: Vec<Vec<GraphLink>> = files
        .par_iter()
        .enumerate()
        .map(|(i, file)| {
            if ctx.is_cancelled() {
                return Vec::new();
            }
            let extractor = &extractors[&(file.project_root.as_path(), file.ecosystem)];
            let aliases = &tsconfig[file.project_root.as_path()];

            let mut targets: Vec<usize> = extractor
                .extract(&file.content)
                .iter()
                .filter_map(|spec| {
                    resolver.resolve_specifier(spec, &file.path, &file.project_root, aliases)
                })
                .filter_map(|target| index.get(target.as_path()).copied())
                .filter(|&j| j != i)
                .collect();
            targets.sort_unstable();
            targets.dedup();

            targets
                .into_iter()
                .map(|j| GraphLink::reference(NodeId::Index(i), NodeId::Index(j), LinkKind::Dependency))
                .collect()
        })
        .collect();

    let nodes: Vec<GraphNode> = files
        .into_iter()
        .enumerate()
        .map(|(i, file)| {
            let ext = file.path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let mut node = GraphNode::new(NodeId::Index(i), name, NodeKind::File(ext.clone()))
                .with_visuals(generic_group(file.ecosystem, &ext), content_radius(&file.content))
                .with_project(
                    file.ecosystem.map(|e| e.as_str()).unwrap_or("unknown"),
                    Some(file.project_root.clone()),
                );
            node.path = Some(
                file.path.strip_prefix(&ctx.root).unwrap_or(&file.path).to_string_lossy().to_string(),
            );
            node.with_content(file.content)
        })
        .collect();

    let graph = GraphData { nodes, links: links.into_iter().flatten().collect() };
    debug!("Generic graph has {} nodes and {} links", graph.nodes.len(), graph.links.len());
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_core::{CancellationToken, ScanOptions, detect_projects};
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

    fn scan(root: &Path, claimed: &HashSet<PathBuf>) -> GraphData {
        let ctx = ScanContext::new(root, ScanOptions::default(), CancellationToken::new());
        let projects = ProjectIndex::new(detect_projects(root, &ctx.options.ignore, &ctx.cancel));
        analyze_generic(&ctx, &projects, claimed)
    }

    fn node<'g>(graph: &'g GraphData, name: &str) -> &'g GraphNode {
        graph.nodes.iter().find(|n| n.name == name).unwrap()
    }

    #[test]
    fn test_unmarked_tree_uses_dense_indices() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "lib/a.js", "const b = require('./b');");
        create_test_file(root, "lib/b.js", "module.exports = 1;");
        create_test_file(root, "lib/empty.js", "   \n");
        create_test_file(root, "styles/main.css", "@import './reset.css';");
        create_test_file(root, "styles/reset.css", "* { margin: 0; }");

        let graph = scan(root, &HashSet::new());
        assert_eq!(graph.nodes.len(), 4);
        let ids: Vec<NodeId> = graph.nodes.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, (0..4).map(NodeId::Index).collect::<Vec<_>>());

        let a = node(&graph, "a.js");
        assert_eq!(a.project.as_deref(), Some("unknown"));
        assert_eq!(a.path.as_deref(), Some("lib/a.js"));
        assert_eq!(a.kind, NodeKind::File("js".to_string()));
        assert_eq!(a.group, 9);
        assert_eq!(a.radius, 8);

        let b = node(&graph, "b.js");
        assert!(graph.links.iter().any(|l| l.source == a.id && l.target == b.id && l.value == 1));
        let main = node(&graph, "main.css");
        let reset = node(&graph, "reset.css");
        assert!(graph.links.iter().any(|l| l.source == main.id && l.target == reset.id));
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn test_ecosystem_tags_and_module_imports() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "api/requirements.txt", "flask");
        create_test_file(root, "api/app.py", "from services.users import list_users\nimport os\n");
        create_test_file(root, "api/services/users.py", "def list_users(): pass\n");
        create_test_file(root, "web/package.json", "{}");
        create_test_file(root, "web/src/index.ts", "import { x } from './x';");
        create_test_file(root, "web/src/x.ts", "export const x = 1;");

        let graph = scan(root, &HashSet::new());
        let app = node(&graph, "app.py");
        let users = node(&graph, "users.py");
        assert_eq!(app.project.as_deref(), Some("python"));
        assert_eq!(app.group, 5);
        assert_eq!(app.project_root.as_deref(), Some(root.join("api").as_path()));
        assert!(graph.links.iter().any(|l| l.source == app.id && l.target == users.id));

        let index = node(&graph, "index.ts");
        assert_eq!(index.project.as_deref(), Some("node"));
        assert_eq!(index.group, 2);
        let x = node(&graph, "x.ts");
        assert!(graph.links.iter().any(|l| l.source == index.id && l.target == x.id));
    }

    #[test]
    fn test_claimed_files_are_excluded() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "a.js", "require('./b');");
        let b = create_test_file(root, "b.js", "module.exports = 1;");

        let claimed: HashSet<PathBuf> = [b].into_iter().collect();
        let graph = scan(root, &claimed);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_generic_group() {
        assert_eq!(generic_group(Some(Ecosystem::Node), "jsx"), 1);
        assert_eq!(generic_group(Some(Ecosystem::Node), "json"), 3);
        assert_eq!(generic_group(Some(Ecosystem::Node), "css"), 9);
        assert_eq!(generic_group(Some(Ecosystem::Php), "php"), 8);
        assert_eq!(generic_group(Some(Ecosystem::Java), "java"), 7);
        assert_eq!(generic_group(Some(Ecosystem::Go), "js"), 9);
        assert_eq!(generic_group(None, "md"), 3);
    }
}
