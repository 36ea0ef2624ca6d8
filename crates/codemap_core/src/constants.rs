//! Constants for file extensions, manifest markers and directory conventions.
//!
//! This module centralizes the fixed tables every analyzer shares so that
//! resolution precedence and directory skipping stay consistent across the
//! structural analyzers and the generic pass.
//!
//! ## Resolution precedence
//!
//! Extension lists are ordered. When several files share a basename
//! (`Button.tsx` and `Button.js`), the first extension in the list wins.

use crate::types::Ecosystem;

/// Extensions tried when resolving component-style imports (in priority order)
pub const COMPONENT_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// Extensions tried when resolving imports inside backend projects
pub const BACKEND_EXTENSIONS: &[&str] = &["ts", "js", "json"];

/// Extensions tried by the generic dependency pass
pub const GENERIC_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js", "json"];

/// Files the generic pass reads and turns into nodes
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "json", "vue", "py", "rb", "java", "php", "css", "scss",
];

/// Directory names that are never descended into (build output, vendored code)
pub const ALWAYS_SKIPPED_DIRS: &[&str] = &[
    ".next",
    "dist",
    "build",
    "node_modules",
    "vendor",
    "bin",
    "__pycache__",
    "venv",
    "target",
    "out",
    "migrations",
    ".prisma",
    "generated",
    ".git",
];

/// Manifest file names and the ecosystem tag each one marks.
///
/// Order matters: when one directory holds several markers the first match
/// decides the ecosystem.
pub const PROJECT_MARKERS: &[(&str, Ecosystem)] = &[
    ("package.json", Ecosystem::Node),
    ("composer.json", Ecosystem::Php),
    ("pom.xml", Ecosystem::Java),
    ("build.gradle", Ecosystem::Java),
    ("requirements.txt", Ecosystem::Python),
    ("go.mod", Ecosystem::Go),
    ("Cargo.toml", Ecosystem::Rust),
    ("mix.exs", Ecosystem::Elixir),
    ("pubspec.yaml", Ecosystem::Dart),
    ("Gemfile", Ecosystem::Ruby),
];

/// Default alias prefix for source-root imports (`@/lib/db`)
pub const DEFAULT_ALIAS_PREFIX: &str = "@/";

/// Names ignored by the CLI when the user passes nothing
pub const DEFAULT_IGNORES: &[&str] = &["node_modules", ".git", "logs", "package-lock.json"];

/// Upper bound on concurrently dispatched file reads
pub const READ_BATCH_SIZE: usize = 50;
