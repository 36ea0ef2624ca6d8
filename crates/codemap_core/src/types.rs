use serde::{Serialize, Serializer};
use std::{
    borrow::Cow,
    fmt,
    path::{Path, PathBuf},
};

/// A raw import specifier as found in source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Specifier {
    pub request: String,
    pub kind: SpecKind,
}

impl Specifier {
    pub fn new(request: impl Into<String>, kind: SpecKind) -> Self {
        Self { request: request.into(), kind }
    }

    /// Relative (`./x`, `../x`), root-absolute (`/x`) or alias-rooted (`@/x`).
    pub fn is_local(&self, alias_prefix: &str) -> bool {
        is_local_request(&self.request, alias_prefix)
    }
}

pub fn is_local_request(request: &str, alias_prefix: &str) -> bool {
    request.starts_with('.')
        || request.starts_with('/')
        || (!alias_prefix.is_empty() && request.starts_with(alias_prefix))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecKind {
    /// `import ... from`, bare `import '...'`, `require(...)`
    Static,
    /// `import('...')`
    Dynamic,
    /// `@import` / `url(...)`
    Style,
    /// Dotted or namespaced module path from a non-JS ecosystem
    Module(Ecosystem),
}

/// Ecosystem tag derived from the manifest file that marks a project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Node,
    Php,
    Java,
    Python,
    Go,
    Rust,
    Elixir,
    Dart,
    Ruby,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Node => "node",
            Ecosystem::Php => "php",
            Ecosystem::Java => "java",
            Ecosystem::Python => "python",
            Ecosystem::Go => "go",
            Ecosystem::Rust => "rust",
            Ecosystem::Elixir => "elixir",
            Ecosystem::Dart => "dart",
            Ecosystem::Ruby => "ruby",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Ecosystem::Node => "Node.js",
            Ecosystem::Php => "PHP",
            Ecosystem::Java => "Java",
            Ecosystem::Python => "Python",
            Ecosystem::Go => "Go",
            Ecosystem::Rust => "Rust",
            Ecosystem::Elixir => "Elixir",
            Ecosystem::Dart => "Dart",
            Ecosystem::Ruby => "Ruby",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directory holding a recognized manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub ecosystem: Ecosystem,
}

/// Node identity.
///
/// Path-based and synthetic ids come from the structural analyzers, index ids
/// from the generic pass. Keeping them as separate variants means the two
/// families can never collide, whatever their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Path(PathBuf),
    Key(String),
    Index(usize),
}

impl NodeId {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            NodeId::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl From<&Path> for NodeId {
    fn from(p: &Path) -> Self {
        NodeId::Path(p.to_path_buf())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Path(p) => write!(f, "{}", p.display()),
            NodeId::Key(k) => f.write_str(k),
            NodeId::Index(i) => write!(f, "{}", i),
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeId::Path(p) => serializer.serialize_str(&p.to_string_lossy()),
            NodeId::Key(k) => serializer.serialize_str(k),
            NodeId::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

/// Role tag of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Application,
    Server,
    Layout,
    Page,
    Route,
    Screen,
    Navigation,
    Component,
    Controller,
    Model,
    Service,
    Middleware,
    Utility,
    Config,
    Type,
    Database,
    Helper,
    Endpoint,
    Module,
    /// Conventional backend folder, e.g. `route-folder`
    Folder(Box<NodeKind>),
    /// Generic-pass file tagged by its extension
    File(String),
}

impl NodeKind {
    pub fn as_str(&self) -> Cow<'_, str> {
        let s = match self {
            NodeKind::Application => "application",
            NodeKind::Server => "server",
            NodeKind::Layout => "layout",
            NodeKind::Page => "page",
            NodeKind::Route => "route",
            NodeKind::Screen => "screen",
            NodeKind::Navigation => "navigation",
            NodeKind::Component => "component",
            NodeKind::Controller => "controller",
            NodeKind::Model => "model",
            NodeKind::Service => "service",
            NodeKind::Middleware => "middleware",
            NodeKind::Utility => "utility",
            NodeKind::Config => "config",
            NodeKind::Type => "type",
            NodeKind::Database => "database",
            NodeKind::Helper => "helper",
            NodeKind::Endpoint => "endpoint",
            NodeKind::Module => "module",
            NodeKind::Folder(role) => return Cow::Owned(format!("{}-folder", role.as_str())),
            NodeKind::File(ext) => return Cow::Borrowed(ext.as_str()),
        };
        Cow::Borrowed(s)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

/// Edge kind tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkKind {
    Imports,
    Route,
    UsesLayout,
    LayoutStructure,
    NavigationRoute,
    EndpointDefinition,
    ServerEntry,
    FolderStructure,
    Dependency,
    /// `${role}-structure`, a file attached to its role container
    Structure(NodeKind),
}

impl LinkKind {
    pub fn as_str(&self) -> Cow<'_, str> {
        let s = match self {
            LinkKind::Imports => "imports",
            LinkKind::Route => "route",
            LinkKind::UsesLayout => "uses-layout",
            LinkKind::LayoutStructure => "layout-structure",
            LinkKind::NavigationRoute => "navigation-route",
            LinkKind::EndpointDefinition => "endpoint-definition",
            LinkKind::ServerEntry => "server-entry",
            LinkKind::FolderStructure => "folder-structure",
            LinkKind::Dependency => "dependency",
            LinkKind::Structure(role) => return Cow::Owned(format!("{}-structure", role.as_str())),
        };
        Cow::Borrowed(s)
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl Serialize for LinkKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub group: u32,
    pub radius: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
}

impl GraphNode {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            path: None,
            kind,
            content: None,
            group: 0,
            radius: 0,
            project: None,
            project_root: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_visuals(mut self, group: u32, radius: u32) -> Self {
        self.group = group;
        self.radius = radius;
        self
    }

    pub fn with_project(mut self, project: impl Into<String>, root: Option<PathBuf>) -> Self {
        self.project = Some(project.into());
        self.project_root = root;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphLink {
    pub source: NodeId,
    pub target: NodeId,
    pub value: u32,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

impl GraphLink {
    /// A file-references-file edge (weight 1).
    pub fn reference(source: NodeId, target: NodeId, kind: LinkKind) -> Self {
        Self { source, target, value: 1, kind }
    }

    /// A containment/hierarchy edge (weight 2).
    pub fn structural(source: NodeId, target: NodeId, kind: LinkKind) -> Self {
        Self { source, target, value: 2, kind }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphData {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn append(&mut self, mut other: GraphData) {
        self.nodes.append(&mut other.nodes);
        self.links.append(&mut other.links);
    }

    pub fn strip_content(&mut self) {
        for node in &mut self.nodes {
            node.content = None;
        }
    }
}

/// Visual size derived from content length: `clamp(8, 20, log2(lines) * 3)`,
/// rounded to the nearest whole unit since radii are integers.
pub fn content_radius(content: &str) -> u32 {
    let lines = content.split('\n').count().max(1) as f64;
    (lines.log2() * 3.0).clamp(8.0, 20.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_requests() {
        assert!(is_local_request("./a", "@/"));
        assert!(is_local_request("../a", "@/"));
        assert!(is_local_request("/abs", "@/"));
        assert!(is_local_request("@/lib/db", "@/"));
        assert!(!is_local_request("react", "@/"));
        assert!(!is_local_request("@scope/pkg", "@/"));
        assert!(!is_local_request("@/lib/db", ""));
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(NodeKind::Folder(Box::new(NodeKind::Route)).as_str(), "route-folder");
        assert_eq!(NodeKind::File("py".to_string()).as_str(), "py");
        assert_eq!(LinkKind::Structure(NodeKind::Controller).as_str(), "controller-structure");
        assert_eq!(LinkKind::UsesLayout.as_str(), "uses-layout");
    }

    #[test]
    fn test_node_id_serialization_keeps_families_apart() {
        let path = serde_json::to_value(NodeId::Path(PathBuf::from("/p/a.ts"))).unwrap();
        let key = serde_json::to_value(NodeId::Key("app:/p".to_string())).unwrap();
        let index = serde_json::to_value(NodeId::Index(3)).unwrap();
        assert_eq!(path, serde_json::json!("/p/a.ts"));
        assert_eq!(key, serde_json::json!("app:/p"));
        assert_eq!(index, serde_json::json!(3));
        assert_ne!(NodeId::Key("3".to_string()), NodeId::Index(3));
    }

    #[test]
    fn test_node_serializes_consumer_field_names() {
        let node = GraphNode::new(NodeId::Index(0), "a.ts", NodeKind::File("ts".to_string()))
            .with_visuals(2, 8)
            .with_project("node", Some(PathBuf::from("/p")));
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["type"], "ts");
        assert_eq!(v["projectRoot"], "/p");
        assert!(v.get("content").is_none());
    }

    #[test]
    fn test_content_radius_is_clamped() {
        assert_eq!(content_radius(""), 8);
        assert_eq!(content_radius(&"x\n".repeat(15)), 12);
        assert_eq!(content_radius(&"x\n".repeat(10_000)), 20);
    }

    #[test]
    fn test_link_weights() {
        let a = NodeId::Key("a".into());
        let b = NodeId::Key("b".into());
        assert_eq!(GraphLink::reference(a.clone(), b.clone(), LinkKind::Imports).value, 1);
        assert_eq!(GraphLink::structural(a, b, LinkKind::LayoutStructure).value, 2);
    }
}
