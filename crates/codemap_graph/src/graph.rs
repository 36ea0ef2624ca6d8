use log::{debug, info};
use std::collections::HashSet;

use codemap_core::{GraphData, GraphLink, NodeId};

/// Merges analyzer outputs into one consistent graph.
///
/// The first node seen for an id wins. Links survive only when both ends
/// exist, they are not self-links, and they were not already emitted.
pub fn assemble(parts: Vec<GraphData>) -> GraphData {
    let mut merged = GraphData::default();
    let mut ids: HashSet<NodeId> = HashSet::new();
    let mut candidate_links: Vec<GraphLink> = Vec::new();
    let mut duplicate_nodes = 0usize;

    for part in parts {
        for node in part.nodes {
            if ids.insert(node.id.clone()) {
                merged.nodes.push(node);
            } else {
                duplicate_nodes += 1;
            }
        }
        candidate_links.extend(part.links);
    }

    let mut seen: HashSet<GraphLink> = HashSet::new();
    let mut dropped = 0usize;
    for link in candidate_links {
        let valid = link.source != link.target
            && ids.contains(&link.source)
            && ids.contains(&link.target);
        if valid && seen.insert(link.clone()) {
            merged.links.push(link);
        } else {
            dropped += 1;
        }
    }

    if duplicate_nodes > 0 || dropped > 0 {
        debug!("Merge dropped {} duplicate nodes and {} links", duplicate_nodes, dropped);
    }
    info!("Assembled graph: {} nodes, {} links", merged.nodes.len(), merged.links.len());
    merged
}
