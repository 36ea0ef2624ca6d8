//! Core building blocks for codemap.
//!
//! This crate holds everything the analyzers share:
//! - The graph data model handed to renderers
//! - Import extraction (pattern-based, or parser-based via oxc)
//! - Path resolution against alias roots, index files and extension variants
//! - Project discovery, manifest reading and framework classification
//! - Per-scan context and cancellation

mod cancel;
mod collector;
mod config;
mod constants;
mod context;
mod detect;
mod extractor;
mod parser;
mod resolver;
mod types;

// Re-export public API
pub use cancel::CancellationToken;
pub use collector::{
    DirItem, collect_source_files, detect_projects, is_skipped, list_dir, read_files,
};
pub use config::{
    PackageManifest, find_git_root, read_manifest, read_tsconfig_paths,
};
pub use constants::{
    ALWAYS_SKIPPED_DIRS, BACKEND_EXTENSIONS, COMPONENT_EXTENSIONS, DEFAULT_ALIAS_PREFIX,
    DEFAULT_IGNORES, GENERIC_EXTENSIONS, PROJECT_MARKERS, READ_BATCH_SIZE, SOURCE_EXTENSIONS,
};
pub use context::{ProjectIndex, ScanContext, ScanOptions};
pub use detect::{ProjectKind, classify, classify_manifest};
pub use extractor::{
    ExtractorStrategy, ImportExtractor, LocalFilter, RegexExtractor, build_extractor,
};
pub use parser::AstExtractor;
pub use resolver::{Resolver, resolve_module, source_root};
pub use types::{
    Ecosystem, GraphData, GraphLink, GraphNode, LinkKind, NodeId, NodeKind, Project, SpecKind,
    Specifier, content_radius,
};
