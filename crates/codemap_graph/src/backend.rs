//! Server-framework backends: an entry file plus conventional role folders
//! (`routes/`, `controllers/`, ...), with HTTP endpoints lifted out of route
//! files.

use log::{debug, trace, warn};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use codemap_core::{
    BACKEND_EXTENSIONS, GraphData, GraphLink, GraphNode, LinkKind, NodeId, NodeKind, ScanContext,
    is_skipped, list_dir, read_files, read_manifest, source_root,
};

use crate::builder::{GraphBuilder, Placement, file_stem};

const PROJECT_TAG: &str = "nodejs";

/// Conventional folders and the role of the files inside them.
const ROLE_FOLDERS: &[(&str, NodeKind)] = &[
    ("routes", NodeKind::Route),
    ("controllers", NodeKind::Controller),
    ("models", NodeKind::Model),
    ("services", NodeKind::Service),
    ("middleware", NodeKind::Middleware),
    ("utils", NodeKind::Utility),
    ("config", NodeKind::Config),
    ("types", NodeKind::Type),
    ("prisma", NodeKind::Database),
    ("helpers", NodeKind::Helper),
];

fn regex_endpoint() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\.(get|post|put|delete|patch)\(\s*['"]([^'"]+)['"]"#)
            .expect("valid regex literal")
    })
}

pub fn role_group(kind: &NodeKind) -> u32 {
    match kind {
        NodeKind::Application => 0,
        NodeKind::Server => 1,
        NodeKind::Route => 2,
        NodeKind::Controller => 3,
        NodeKind::Model => 4,
        NodeKind::Service => 5,
        NodeKind::Middleware => 6,
        NodeKind::Utility => 7,
        NodeKind::Config => 8,
        NodeKind::Endpoint => 9,
        NodeKind::Database => 10,
        NodeKind::Helper => 11,
        NodeKind::Type => 12,
        _ => 13,
    }
}

pub fn role_radius(kind: &NodeKind) -> u32 {
    match kind {
        NodeKind::Application => 30,
        NodeKind::Server => 25,
        NodeKind::Route => 20,
        NodeKind::Controller | NodeKind::Model => 18,
        NodeKind::Service | NodeKind::Database => 15,
        NodeKind::Middleware | NodeKind::Helper => 12,
        NodeKind::Endpoint => 8,
        _ => 10,
    }
}

/// Role of a file from the nearest conventional folder above it.
fn role_of(path: &Path, project_root: &Path) -> NodeKind {
    let dir = path.parent().unwrap_or(path);
    let relative = dir.strip_prefix(project_root).unwrap_or(dir);
    let names: Vec<String> =
        relative.components().map(|c| c.as_os_str().to_string_lossy().to_string()).collect();
    names
        .iter()
        .rev()
        .find_map(|name| {
            ROLE_FOLDERS.iter().find(|(folder, _)| *folder == name.as_str()).map(|(_, k)| k.clone())
        })
        .unwrap_or(NodeKind::Module)
}

fn role_node(path: &Path, content: &str, kind: NodeKind) -> GraphNode {
    let (group, radius) = (role_group(&kind), role_radius(&kind));
    GraphNode::new(NodeId::Path(path.to_path_buf()), file_stem(path), kind)
        .with_content(content)
        .with_visuals(group, radius)
}

pub fn analyze_backend(ctx: &ScanContext, project_root: &Path) -> GraphData {
    let mut builder = GraphBuilder::new(ctx, project_root, PROJECT_TAG, BACKEND_EXTENSIONS);
    let dependency_node = |path: &Path, content: &str| role_node(path, content, role_of(path, project_root));

    let app_id = NodeId::Key(format!("{}-{}", PROJECT_TAG, project_root.display()));
    builder.add_node(
        GraphNode::new(app_id.clone(), "Node.js Backend", NodeKind::Application)
            .with_visuals(0, 30),
    );

    let main = match read_manifest(project_root) {
        Ok(manifest) => manifest.main,
        Err(e) => {
            debug!("Assuming index.js entry for {}: {:#}", project_root.display(), e);
            Some("index.js".to_string())
        }
    };

    let mut anchor = app_id.clone();
    if let Some(entry) = main.and_then(|m| locate_entry(project_root, &m)) {
        match std::fs::read_to_string(&entry) {
            Ok(content) => {
                let id = NodeId::Path(entry.clone());
                builder.add_node(
                    GraphNode::new(id.clone(), "Server", NodeKind::Server)
                        .with_content(content.as_str())
                        .with_visuals(role_group(&NodeKind::Server), role_radius(&NodeKind::Server)),
                );
                builder.add_link(GraphLink::structural(id.clone(), app_id.clone(), LinkKind::ServerEntry));
                builder.pull_dependencies(&id, &entry, &content, &dependency_node);
                anchor = id;
            }
            Err(e) => warn!("Error reading server entry {}: {}", entry.display(), e),
        }
    }

    let base = source_root(project_root);
    for (folder, role) in ROLE_FOLDERS {
        if ctx.is_cancelled() {
            break;
        }
        let folder_path = base.join(folder);
        if !folder_path.is_dir() {
            continue;
        }
        debug!("Scanning {} folder {}", role, folder_path.display());

        let folder_kind = NodeKind::Folder(Box::new(role.clone()));
        let folder_id = NodeId::Key(format!("{}#folder-{}", project_root.display(), folder));
        builder.add_node(
            GraphNode::new(folder_id.clone(), *folder, folder_kind).with_visuals(role_group(role), 20),
        );
        builder.add_link(GraphLink::structural(folder_id.clone(), anchor.clone(), LinkKind::FolderStructure));

        let scan = FolderScan { folder_id: &folder_id, role, dependency_node: &dependency_node };
        scan.walk(&mut builder, &folder_path);
    }

    builder.finish()
}

/// The manifest's `main`, then the same file name under `src/`, each tried
/// as-is or with `.ts`/`.js` appended when it has no extension.
fn locate_entry(project_root: &Path, main: &str) -> Option<PathBuf> {
    let entry = path_clean::clean(project_root.join(main));
    let in_src = project_root.join("src").join(entry.file_name()?);
    [entry, in_src].into_iter().find_map(|candidate| with_script_extension(&candidate))
}

fn with_script_extension(candidate: &Path) -> Option<PathBuf> {
    if candidate.extension().is_none()
        && let Some(found) = ["ts", "js"]
            .iter()
            .map(|ext| PathBuf::from(format!("{}.{}", candidate.display(), ext)))
            .find(|p| p.is_file())
    {
        return Some(found);
    }
    candidate.is_file().then(|| candidate.to_path_buf())
}

struct FolderScan<'s> {
    folder_id: &'s NodeId,
    role: &'s NodeKind,
    dependency_node: &'s dyn Fn(&Path, &str) -> GraphNode,
}

impl FolderScan<'_> {
    fn walk(&self, builder: &mut GraphBuilder<'_>, dir: &Path) {
        let ctx = builder.ctx();
        if ctx.is_cancelled() {
            return;
        }
        let items = match list_dir(dir) {
            Ok(items) => items,
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                return;
            }
        };

        let files: Vec<PathBuf> = items
            .iter()
            .filter(|i| !i.is_dir && (i.name.ends_with(".js") || i.name.ends_with(".ts")))
            .map(|i| i.path.clone())
            .collect();
        let mut contents = read_files(&files, &ctx.cancel).into_iter().peekable();

        for item in &items {
            if item.is_dir {
                if !is_skipped(&item.name, true, &ctx.options.ignore) {
                    self.walk(builder, &item.path);
                }
                continue;
            }
            let Some((path, content)) = contents.next_if(|(p, _)| *p == item.path) else {
                continue;
            };
            if let Some(content) = content {
                self.add_file(builder, &path, &content);
            }
        }
    }

    fn add_file(&self, builder: &mut GraphBuilder<'_>, path: &Path, content: &str) {
        let id = NodeId::Path(path.to_path_buf());
        let placement = builder.add_node(role_node(path, content, self.role.clone()));
        if placement == Placement::Kept {
            trace!("{} already has a structural role", path.display());
            return;
        }

        builder.add_link(GraphLink::reference(
            id.clone(),
            self.folder_id.clone(),
            LinkKind::Structure(self.role.clone()),
        ));
        if placement == Placement::New {
            builder.pull_dependencies(&id, path, content, self.dependency_node);
        }
        if *self.role == NodeKind::Route {
            add_endpoints(builder, &id, path, content);
        }
    }
}

/// One `endpoint` node per `.get('/x')`-style registration in a route file.
fn add_endpoints(builder: &mut GraphBuilder<'_>, route_id: &NodeId, path: &Path, content: &str) {
    for caps in regex_endpoint().captures_iter(content) {
        let method = caps[1].to_ascii_uppercase();
        let route = &caps[2];
        let id = NodeId::Key(format!("{}#{} {}", path.display(), method, route));
        if builder.contains(&id) {
            continue;
        }
        trace!("Found endpoint {} {} in {}", method, route, path.display());
        let node = GraphNode::new(id.clone(), route, NodeKind::Endpoint)
            .with_content(format!("Endpoint: {} {}", method, route))
            .with_visuals(role_group(&NodeKind::Endpoint), role_radius(&NodeKind::Endpoint));
        builder.add_node(node);
        builder.add_link(GraphLink::reference(id, route_id.clone(), LinkKind::EndpointDefinition));
    }
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
        analyze_backend(&ctx, root)
    }

    fn count(graph: &GraphData, kind: NodeKind) -> usize {
        graph.nodes.iter().filter(|n| n.kind == kind).count()
    }

    #[test]
    fn test_route_file_endpoints() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "dependencies": { "express": "^4" } }"#);
        let users = create_test_file(
            root,
            "routes/users.js",
            "const router = require('express').Router();\nrouter.get('/users', list);\nrouter.post('/users', create);\nmodule.exports = router;",
        );

        let graph = scan(root);
        assert_eq!(count(&graph, NodeKind::Route), 1);

        let endpoints: Vec<&GraphNode> =
            graph.nodes.iter().filter(|n| n.kind == NodeKind::Endpoint).collect();
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.iter().all(|n| n.name == "/users"));

        let definitions: Vec<&GraphLink> =
            graph.links.iter().filter(|l| l.kind == LinkKind::EndpointDefinition).collect();
        assert_eq!(definitions.len(), 2);
        assert!(definitions.iter().all(|l| l.target == NodeId::Path(users.clone())));
    }

    #[test]
    fn test_server_entry_and_folders() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "package.json",
            r#"{ "main": "server", "dependencies": { "express": "^4" } }"#,
        );
        let server = create_test_file(root, "src/server.ts", "import users from './routes/users';");
        let users = create_test_file(
            root,
            "src/routes/users.ts",
            "import { list } from '../controllers/users';\nrouter.get('/', list);",
        );
        let controller = create_test_file(root, "src/controllers/users.ts", "export const list = 1;");

        let graph = scan(root);
        let server_node = graph.nodes.iter().find(|n| n.kind == NodeKind::Server).unwrap();
        assert_eq!(server_node.id, NodeId::Path(server.clone()));
        assert_eq!(server_node.name, "Server");

        // routes/users.ts was reached as an import first and is not duplicated
        assert_eq!(graph.nodes.iter().filter(|n| n.id == NodeId::Path(users.clone())).count(), 1);
        let structure = graph
            .links
            .iter()
            .find(|l| l.kind == LinkKind::Structure(NodeKind::Route))
            .unwrap();
        assert_eq!(structure.source, NodeId::Path(users.clone()));

        let route_folder = graph
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Folder(Box::new(NodeKind::Route)))
            .unwrap();
        assert_eq!(structure.target, route_folder.id);
        assert!(graph.links.iter().any(|l| l.source == route_folder.id
            && l.target == NodeId::Path(server.clone())
            && l.kind == LinkKind::FolderStructure));

        let controller_node =
            graph.nodes.iter().find(|n| n.id == NodeId::Path(controller.clone())).unwrap();
        assert_eq!(controller_node.kind, NodeKind::Controller);
        assert_eq!(controller_node.group, 3);
        assert_eq!(count(&graph, NodeKind::Endpoint), 1);
    }

    #[test]
    fn test_without_entry_folders_hang_off_app() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "dependencies": { "express": "^4" } }"#);
        create_test_file(root, "models/user.js", "module.exports = {};");

        let graph = scan(root);
        assert_eq!(count(&graph, NodeKind::Server), 0);
        let folder = graph
            .links
            .iter()
            .find(|l| l.kind == LinkKind::FolderStructure)
            .unwrap();
        assert_eq!(folder.target, graph.nodes[0].id);
        assert_eq!(count(&graph, NodeKind::Model), 1);
    }

    #[test]
    fn test_role_of() {
        let root = Path::new("/p");
        assert_eq!(role_of(Path::new("/p/src/models/user.ts"), root), NodeKind::Model);
        assert_eq!(role_of(Path::new("/p/src/services/mail/index.ts"), root), NodeKind::Service);
        assert_eq!(role_of(Path::new("/p/src/app.ts"), root), NodeKind::Module);
    }
}
