use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;

use codemap_core::GraphData;

use crate::types::ScanResult;

/// Writes the graph as JSON, followed by a newline.
pub fn write_graph_json<W: Write>(writer: &mut W, graph: &GraphData, pretty: bool) -> Result<()> {
    debug!("Writing graph JSON ({} nodes, pretty={})", graph.nodes.len(), pretty);
    let written = if pretty {
        serde_json::to_writer_pretty(&mut *writer, graph)
    } else {
        serde_json::to_writer(&mut *writer, graph)
    };
    written.context("Failed to serialize graph")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn print_nothing_found<W: Write>(writer: &mut W, root: &Path) -> io::Result<()> {
    debug!("Empty graph");
    writeln!(
        writer,
        "{} No source files found under {}",
        "✓".green().bold(),
        root.display().to_string().blue()
    )?;
    writer.flush()?;
    Ok(())
}

fn count_by(tags: impl Iterator<Item = String>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for tag in tags {
        *counts.entry(tag).or_default() += 1;
    }
    counts
}

fn print_counts<W: Write>(
    writer: &mut W,
    title: &str,
    total: usize,
    counts: &BTreeMap<String, usize>,
) -> io::Result<()> {
    writeln!(writer, "  {}: {}", title, total.to_string().yellow().bold())?;

    // Largest buckets first, ties by name
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (idx, (tag, count)) in sorted.iter().enumerate() {
        let prefix = if idx == sorted.len() - 1 { "└──" } else { "├──" };
        writeln!(writer, "    {} {} {}", prefix.dimmed(), tag, count.to_string().cyan())?;
    }
    Ok(())
}

/// Per-type node and link counts plus the detected projects.
pub fn print_summary<W: Write>(writer: &mut W, result: &ScanResult, root: &Path) -> io::Result<()> {
    let graph = &result.graph;
    let node_counts = count_by(graph.nodes.iter().map(|n| n.kind.to_string()));
    let link_counts = count_by(graph.links.iter().map(|l| l.kind.to_string()));

    writeln!(writer, "{}", "─".repeat(60).dimmed())?;
    writeln!(writer, "{}", "Summary".bold())?;
    writeln!(writer, "  Projects: {}", result.projects.len().to_string().yellow().bold())?;
    for (project_root, kind) in &result.projects {
        let display = match project_root.strip_prefix(root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => project_root.display().to_string(),
        };
        let label = kind.map(|k| k.to_string()).unwrap_or_else(|| "generic".to_string());
        writeln!(writer, "    {} ({})", display.blue(), label.dimmed())?;
    }
    print_counts(writer, "Nodes", graph.nodes.len(), &node_counts)?;
    print_counts(writer, "Links", graph.links.len(), &link_counts)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemap_core::{GraphLink, GraphNode, LinkKind, NodeId, NodeKind, ProjectKind};
    use std::path::PathBuf;

    fn sample() -> ScanResult {
        let app = NodeId::Key("nodejs-/repo/api".to_string());
        let route = NodeId::Path(PathBuf::from("/repo/api/routes/users.js"));
        let graph = GraphData {
            nodes: vec![
                GraphNode::new(app.clone(), "Node.js Backend", NodeKind::Application)
                    .with_visuals(0, 30),
                GraphNode::new(route.clone(), "users", NodeKind::Route)
                    .with_content("router.get('/users', h);")
                    .with_visuals(2, 20),
                GraphNode::new(NodeId::Index(0), "a.py", NodeKind::File("py".to_string())),
            ],
            links: vec![GraphLink::reference(route, app, LinkKind::Structure(NodeKind::Route))],
        };
        ScanResult {
            graph,
            projects: vec![
                (PathBuf::from("/repo/api"), Some(ProjectKind::Backend)),
                (PathBuf::from("/repo"), None),
            ],
            files_analyzed: 2,
        }
    }

    #[test]
    fn test_graph_json_shape() {
        let mut out = Vec::new();
        write_graph_json(&mut out, &sample().graph, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes[0]["id"], "nodejs-/repo/api");
        assert_eq!(nodes[0]["type"], "application");
        assert!(nodes[0].get("content").is_none());
        assert_eq!(nodes[1]["id"], "/repo/api/routes/users.js");
        assert_eq!(nodes[1]["radius"], 20);
        assert_eq!(nodes[2]["id"], 0);
        assert_eq!(nodes[2]["type"], "py");

        let link = &value["links"][0];
        assert_eq!(link["type"], "route-structure");
        assert_eq!(link["value"], 1);
        assert_eq!(link["target"], "nodejs-/repo/api");
    }

    #[test]
    fn test_pretty_output_is_multiline() {
        let mut out = Vec::new();
        write_graph_json(&mut out, &sample().graph, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().count() > 3);
    }

    #[test]
    fn test_summary_counts() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        print_summary(&mut out, &sample(), Path::new("/repo")).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Projects: 2"));
        assert!(text.contains("api (backend)"));
        assert!(text.contains(". (generic)"));
        assert!(text.contains("Nodes: 3"));
        assert!(text.contains("route-structure 1"));
    }
}
