//! Dependency graph construction for mixed-language codebases.
//!
//! A scan detects every project under a root, runs the structural analyzer
//! matching each recognized JS project (backend, app-router, native mobile or
//! SPA), then runs a generic import pass over every file those analyzers did
//! not claim. The outputs are merged into one `GraphData` of nodes and links.
//!
//! # Examples
//!
//! ```no_run
//! use codemap_core::{CancellationToken, ScanOptions};
//! use codemap_graph::{run_scan, write_graph_json};
//! use std::io::BufWriter;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let outcome = run_scan(Path::new("/path/to/repo"), ScanOptions::default(), CancellationToken::new())?;
//! let result = outcome.into_result();
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! write_graph_json(&mut stdout, &result.graph, true)?;
//! # Ok(())
//! # }
//! ```

mod app_router;
mod backend;
mod builder;
mod config;
mod generic;
mod graph;
mod mobile;
mod reporter;
mod scan;
mod spa;
mod types;

pub use app_router::{analyze_app_router, route_for};
pub use backend::{analyze_backend, role_group, role_radius};
pub use config::Config;
pub use generic::{analyze_generic, generic_group};
pub use graph::assemble;
pub use mobile::{analyze_mobile, display_name};
pub use reporter::{print_nothing_found, print_summary, write_graph_json};
pub use scan::{analyze_project, run_scan};
pub use spa::{SpaVariant, analyze_spa};
pub use types::{ScanOutcome, ScanResult};
