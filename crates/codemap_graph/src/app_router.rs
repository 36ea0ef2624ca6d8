//! File-system routed apps: `layout.*` and `page.*` files under an app
//! directory, where every directory level may add a layout wrapping the pages
//! below it.

use log::{debug, warn};
use std::path::{Component, Path, PathBuf};

use codemap_core::{
    COMPONENT_EXTENSIONS, GraphData, GraphLink, GraphNode, LinkKind, NodeId, NodeKind,
    ScanContext, list_dir, read_files,
};

use crate::builder::{GraphBuilder, Placement, file_name};

const PROJECT_TAG: &str = "nextjs";
const PAGE_ROOTS: &[&str] = &["src/app", "app", "src/pages"];

pub fn analyze_app_router(ctx: &ScanContext, project_root: &Path) -> GraphData {
    let mut builder = GraphBuilder::new(ctx, project_root, PROJECT_TAG, COMPONENT_EXTENSIONS);

    let app_id = NodeId::Key(format!("{}-{}", PROJECT_TAG, project_root.display()));
    builder.add_node(GraphNode::new(app_id.clone(), "Next.js App", NodeKind::Application).with_visuals(0, 30));

    let Some(pages_root) =
        PAGE_ROOTS.iter().map(|dir| project_root.join(dir)).find(|dir| dir.is_dir())
    else {
        debug!("No app or pages directory under {}", project_root.display());
        return builder.finish();
    };
    debug!("Walking routes under {}", pages_root.display());

    let walker = RouteWalker { pages_root: &pages_root, app_id: &app_id };
    walker.walk(&mut builder, &pages_root, None);
    builder.finish()
}

struct RouteWalker<'p> {
    pages_root: &'p Path,
    app_id: &'p NodeId,
}

impl RouteWalker<'_> {
    /// `layout` is the nearest layout above `dir`, if any.
    fn walk(&self, builder: &mut GraphBuilder<'_>, dir: &Path, layout: Option<NodeId>) {
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

        let layout_file = find_convention_file(dir, "layout");
        let page_file = find_convention_file(dir, "page");
        let wanted: Vec<PathBuf> = layout_file.iter().chain(page_file.iter()).cloned().collect();
        let mut contents = read_files(&wanted, &ctx.cancel).into_iter();

        let mut layout = layout;
        if layout_file.is_some()
            && let Some((path, Some(content))) = contents.next()
        {
            let id = NodeId::Path(path.clone());
            let node = GraphNode::new(id.clone(), "layout", NodeKind::Layout)
                .with_content(content.as_str())
                .with_visuals(2, 20);
            let placement = builder.add_node(node);

            let parent = layout.as_ref().unwrap_or(self.app_id);
            builder.add_link(GraphLink::structural(id.clone(), parent.clone(), LinkKind::LayoutStructure));
            // A promoted node had its imports expanded when it was pulled
            if placement == Placement::New {
                builder.pull_dependencies(&id, &path, &content, &component_node);
            }
            layout = Some(id);
        }

        if page_file.is_some()
            && let Some((path, Some(content))) = contents.next()
        {
            let id = NodeId::Path(path.clone());
            let node = GraphNode::new(id.clone(), route_for(dir, self.pages_root), NodeKind::Page)
                .with_content(content.as_str())
                .with_visuals(1, 15);
            let placement = builder.add_node(node);

            let link = match &layout {
                Some(layout_id) => {
                    GraphLink::structural(id.clone(), layout_id.clone(), LinkKind::UsesLayout)
                }
                None => GraphLink::reference(id.clone(), self.app_id.clone(), LinkKind::Route),
            };
            builder.add_link(link);
            if placement == Placement::New {
                builder.pull_dependencies(&id, &path, &content, &component_node);
            }
        }

        // Route segments may be named anything, so only private folders and
        // the caller's exact-name ignores are left out
        for item in items.iter().filter(|i| i.is_dir) {
            if item.name.starts_with('_') || item.name.starts_with('.') || ctx.is_ignored(&item.name) {
                continue;
            }
            self.walk(builder, &item.path, layout.clone());
        }
    }
}

/// `layout.tsx`, `layout.ts`, `layout.jsx` or `layout.js`, in that order.
fn find_convention_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    COMPONENT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
}

fn component_node(path: &Path, content: &str) -> GraphNode {
    GraphNode::new(NodeId::Path(path.to_path_buf()), file_name(path), NodeKind::Component)
        .with_content(content)
        .with_visuals(3, 10)
}

/// URL path served by the page in `dir`.
///
/// Route groups `(name)` vanish, `[...name]` becomes `*` and `[name]`
/// becomes `:name`.
pub fn route_for(dir: &Path, pages_root: &Path) -> String {
    let relative = dir.strip_prefix(pages_root).unwrap_or(dir);
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .filter_map(|segment| route_segment(&segment))
        .collect();
    format!("/{}", segments.join("/"))
}

pub(crate) fn route_segment(segment: &str) -> Option<String> {
    if segment.starts_with('(') && segment.ends_with(')') {
        return None;
    }
    if let Some(inner) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if inner.starts_with("...") {
            return Some("*".to_string());
        }
        return Some(format!(":{}", inner));
    }
    Some(segment.to_string())
}
