//! React Native apps: screens, navigators and shared components under the
//! conventional folders, with each navigator linked to the screens it
//! registers.

use log::{debug, trace, warn};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use codemap_core::{
    COMPONENT_EXTENSIONS, GraphData, GraphLink, GraphNode, LinkKind, NodeId, NodeKind,
    ScanContext, is_skipped, list_dir, read_files, source_root,
};

use crate::builder::{GraphBuilder, Placement, file_name, file_stem};

const PROJECT_TAG: &str = "react-native";

const MOBILE_FOLDERS: &[(&str, NodeKind)] = &[
    ("screens", NodeKind::Screen),
    ("navigation", NodeKind::Navigation),
    ("components", NodeKind::Component),
];

fn regex_screen_registration() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<\w+\.Screen[^>]*name=["']([^"']+)["'][^>]*component=\{([^}]+)\}"#)
            .expect("valid regex literal")
    })
}

fn mobile_group(kind: &NodeKind) -> u32 {
    match kind {
        NodeKind::Application => 0,
        NodeKind::Navigation => 1,
        NodeKind::Screen => 2,
        NodeKind::Component => 3,
        _ => 4,
    }
}

fn mobile_radius(kind: &NodeKind) -> u32 {
    match kind {
        NodeKind::Application => 30,
        NodeKind::Navigation => 25,
        NodeKind::Screen => 20,
        NodeKind::Component => 15,
        _ => 10,
    }
}

/// Display name with the conventional role suffix dropped.
pub fn display_name(stem: &str, kind: &NodeKind) -> String {
    let suffix = match kind {
        NodeKind::Screen => "Screen",
        NodeKind::Navigation => "Navigation",
        _ => return stem.to_string(),
    };
    match stem.strip_suffix(suffix) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => stem.to_string(),
    }
}

/// A `<Stack.Screen name=.. component={..}>` found in a navigation file.
#[derive(Debug)]
struct ScreenRegistration {
    navigator: NodeId,
    route: String,
    component: String,
}

pub fn analyze_mobile(ctx: &ScanContext, project_root: &Path) -> GraphData {
    let mut builder = GraphBuilder::new(ctx, project_root, PROJECT_TAG, COMPONENT_EXTENSIONS);

    let app_id = NodeId::Key(format!("{}-{}", PROJECT_TAG, project_root.display()));
    builder.add_node(
        GraphNode::new(app_id.clone(), "React Native App", NodeKind::Application)
            .with_visuals(0, 30),
    );

    let base = source_root(project_root);
    let mut registrations = Vec::new();
    for (folder, kind) in MOBILE_FOLDERS {
        let folder_path = base.join(folder);
        if !folder_path.is_dir() {
            continue;
        }
        debug!("Scanning {} folder {}", kind, folder_path.display());
        let scan = FolderScan { app_id: &app_id, kind };
        scan.walk(&mut builder, &folder_path, &mut registrations);
    }

    link_registrations(&mut builder, registrations);
    builder.finish()
}

struct FolderScan<'s> {
    app_id: &'s NodeId,
    kind: &'s NodeKind,
}

impl FolderScan<'_> {
    fn walk(
        &self,
        builder: &mut GraphBuilder<'_>,
        dir: &Path,
        registrations: &mut Vec<ScreenRegistration>,
    ) {
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
            .filter(|i| {
                !i.is_dir
                    && Path::new(&i.name)
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| COMPONENT_EXTENSIONS.contains(&e))
            })
            .map(|i| i.path.clone())
            .collect();
        let mut contents = read_files(&files, &ctx.cancel).into_iter().peekable();

        for item in &items {
            if item.is_dir {
                if !is_skipped(&item.name, true, &ctx.options.ignore) {
                    self.walk(builder, &item.path, registrations);
                }
                continue;
            }
            let Some((path, Some(content))) = contents.next_if(|(p, _)| *p == item.path) else {
                continue;
            };
            self.add_file(builder, &path, &content, registrations);
        }
    }

    fn add_file(
        &self,
        builder: &mut GraphBuilder<'_>,
        path: &Path,
        content: &str,
        registrations: &mut Vec<ScreenRegistration>,
    ) {
        let id = NodeId::Path(path.to_path_buf());
        let node = GraphNode::new(id.clone(), display_name(&file_stem(path), self.kind), self.kind.clone())
            .with_content(content)
            .with_visuals(mobile_group(self.kind), mobile_radius(self.kind));
        let placement = builder.add_node(node);
        if placement == Placement::Kept {
            return;
        }

        builder.add_link(GraphLink::reference(
            id.clone(),
            self.app_id.clone(),
            LinkKind::Structure(self.kind.clone()),
        ));
        if placement == Placement::New {
            builder.pull_dependencies(&id, path, content, &component_node);
        }

        if *self.kind == NodeKind::Navigation {
            for caps in regex_screen_registration().captures_iter(content) {
                trace!("{} registers screen '{}'", path.display(), &caps[1]);
                registrations.push(ScreenRegistration {
                    navigator: id.clone(),
                    route: caps[1].to_string(),
                    component: caps[2].trim().to_string(),
                });
            }
        }
    }
}

fn component_node(path: &Path, content: &str) -> GraphNode {
    GraphNode::new(NodeId::Path(path.to_path_buf()), file_name(path), NodeKind::Component)
        .with_content(content)
        .with_visuals(3, 15)
}

/// Points navigators at the screen nodes they register.
///
/// A registration matches a screen by component name (file stem) or by route
/// name against the screen's display name. Unmatched registrations are
/// dropped.
fn link_registrations(builder: &mut GraphBuilder<'_>, registrations: Vec<ScreenRegistration>) {
    for reg in registrations {
        let route_name = display_name(&reg.route, &NodeKind::Screen);
        let target = builder
            .nodes()
            .iter()
            .filter(|n| n.kind == NodeKind::Screen)
            .find(|n| {
                let stem = n.id.as_path().map(file_stem).unwrap_or_default();
                stem == reg.component || n.name == reg.route || n.name == route_name
            })
            .map(|n| n.id.clone());

        match target {
            Some(screen) => builder.add_link(GraphLink::reference(
                reg.navigator,
                screen,
                LinkKind::NavigationRoute,
            )),
            None => debug!("No screen found for navigation route '{}'", reg.route),
        }
    }
}
