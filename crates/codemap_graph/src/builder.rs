use log::{debug, trace};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Arc,
};

use codemap_core::{
    GraphData, GraphLink, GraphNode, ImportExtractor, LinkKind, NodeId, Resolver, ScanContext,
    read_files,
};

/// Builds the node for a file reached through an import.
pub(crate) type NodeFactory<'f> = dyn Fn(&Path, &str) -> GraphNode + 'f;

/// What [`GraphBuilder::add_node`] did with a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// First time this id was seen.
    New,
    /// The id was only known as a pulled dependency and now carries the
    /// structural role.
    Promoted,
    /// The id already had a structural role; the new node was discarded.
    Kept,
}

/// Accumulates the graph of one project for one structural analyzer.
///
/// Owns the processed-set (every id placed so far) and the resolver cache, so
/// a builder must not outlive the analyzer run that created it.
pub(crate) struct GraphBuilder<'a> {
    ctx: &'a ScanContext,
    project_root: PathBuf,
    project_tag: &'static str,
    resolver: Resolver,
    extractor: Box<dyn ImportExtractor>,
    tsconfig_paths: Arc<HashMap<String, Vec<String>>>,
    graph: GraphData,
    positions: HashMap<NodeId, usize>,
    pulled: HashSet<NodeId>,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(
        ctx: &'a ScanContext,
        project_root: &Path,
        project_tag: &'static str,
        extensions: &'static [&'static str],
    ) -> Self {
        Self {
            ctx,
            project_root: project_root.to_path_buf(),
            project_tag,
            resolver: Resolver::new(ctx.options.alias_prefix.clone(), extensions),
            extractor: ctx.extractor_for(project_root, None),
            tsconfig_paths: ctx.tsconfig_paths(project_root),
            graph: GraphData::default(),
            positions: HashMap::new(),
            pulled: HashSet::new(),
        }
    }

    pub(crate) fn ctx(&self) -> &'a ScanContext {
        self.ctx
    }

    pub(crate) fn extractor(&self) -> &dyn ImportExtractor {
        self.extractor.as_ref()
    }

    pub(crate) fn resolve(&self, request: &str, from_file: &Path) -> Option<PathBuf> {
        self.resolver.resolve(request, from_file, &self.project_root, &self.tsconfig_paths)
    }

    pub(crate) fn contains(&self, id: &NodeId) -> bool {
        self.positions.contains_key(id)
    }

    pub(crate) fn nodes(&self) -> &[GraphNode] {
        &self.graph.nodes
    }

    /// Places a node tagged with this project.
    ///
    /// A structural role always wins over the role a file got when it was
    /// first reached as somebody's import.
    pub(crate) fn add_node(&mut self, mut node: GraphNode) -> Placement {
        if node.project.is_none() {
            node = node.with_project(self.project_tag, Some(self.project_root.clone()));
        }

        let Some(&pos) = self.positions.get(&node.id) else {
            self.positions.insert(node.id.clone(), self.graph.nodes.len());
            self.graph.nodes.push(node);
            return Placement::New;
        };

        if !self.pulled.remove(&node.id) {
            trace!("Keeping existing node {}", node.id);
            return Placement::Kept;
        }

        trace!("Promoting {} to {}", node.id, node.kind);
        let existing = &mut self.graph.nodes[pos];
        existing.name = node.name;
        existing.kind = node.kind;
        existing.group = node.group;
        existing.radius = node.radius;
        if node.content.is_some() {
            existing.content = node.content;
        }
        Placement::Promoted
    }

    pub(crate) fn add_link(&mut self, link: GraphLink) {
        self.graph.links.push(link);
    }

    /// Pulls the local imports of `file` into the graph, recursively.
    ///
    /// Every resolved import gets an `imports` edge from `source`; only files
    /// not seen before get a node (built by `factory`) and are expanded in
    /// turn, which keeps import cycles finite. Sibling imports are read
    /// concurrently before any of them is expanded.
    pub(crate) fn pull_dependencies(
        &mut self,
        source: &NodeId,
        file: &Path,
        content: &str,
        factory: &NodeFactory<'_>,
    ) {
        if self.ctx.is_cancelled() {
            return;
        }

        let mut targets: Vec<PathBuf> = Vec::new();
        for spec in self.extractor.extract(content) {
            let Some(target) =
                self.resolver.resolve_specifier(&spec, file, &self.project_root, &self.tsconfig_paths)
            else {
                continue;
            };
            if target != file && !targets.contains(&target) {
                targets.push(target);
            }
        }
        if targets.is_empty() {
            return;
        }

        let fresh: Vec<PathBuf> = targets
            .iter()
            .filter(|t| !self.positions.contains_key(&NodeId::Path((*t).clone())))
            .cloned()
            .collect();
        trace!(
            "{} resolves {} imports, {} new",
            file.display(),
            targets.len(),
            fresh.len()
        );

        let mut expanded = Vec::with_capacity(fresh.len());
        for (path, dep_content) in read_files(&fresh, &self.ctx.cancel) {
            // read_files already recorded why an unreadable import is skipped
            let Some(dep_content) = dep_content else {
                continue;
            };
            let node = factory(&path, &dep_content);
            let id = node.id.clone();
            if self.add_node(node) == Placement::New {
                self.pulled.insert(id);
            }
            expanded.push((path, dep_content));
        }

        for target in targets {
            let id = NodeId::Path(target);
            if self.positions.contains_key(&id) {
                self.add_link(GraphLink::reference(source.clone(), id, LinkKind::Imports));
            }
        }

        for (path, dep_content) in expanded {
            let id = NodeId::Path(path.clone());
            self.pull_dependencies(&id, &path, &dep_content, factory);
        }
    }

    pub(crate) fn finish(self) -> GraphData {
        debug!(
            "Built {} nodes and {} links for {}",
            self.graph.nodes.len(),
            self.graph.links.len(),
            self.project_root.display()
        );
        self.graph
    }
}

/// File name without its extension.
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
}
