use anyhow::Result;
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

use codemap_core::{
    DEFAULT_ALIAS_PREFIX, DEFAULT_IGNORES, ExtractorStrategy, ScanOptions, find_git_root,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "graph")]
#[command(about = "Build a dependency graph of a codebase and print it as JSON")]
pub struct Config {
    /// Root directory to scan (defaults to git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Exact file or directory name to skip (repeatable)
    #[arg(long = "ignore", default_values_t = default_ignores())]
    pub ignore: Vec<String>,

    /// Import prefix that resolves against a project's source directory
    #[arg(long, default_value = DEFAULT_ALIAS_PREFIX)]
    pub alias: String,

    /// Import extraction strategy for JS/TS files: regex or ast
    #[arg(long, default_value = "regex")]
    pub parser: ExtractorStrategy,

    /// Write the graph JSON to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the graph JSON
    #[arg(long)]
    pub pretty: bool,

    /// Leave file contents out of the output
    #[arg(long)]
    pub no_content: bool,
}

fn default_ignores() -> Vec<String> {
    DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect()
}

impl Config {
    /// Resolves the scan root: the given path canonicalized, else the git root.
    pub fn initialize(&mut self) -> Result<()> {
        let root = if let Some(r) = self.root.take() {
            debug!("Using provided root directory: {:?}", r);
            r.canonicalize().unwrap_or(r)
        } else {
            debug!("No root provided, searching for git root");
            find_git_root()?
        };
        info!("Using root directory: {}", root.display());
        self.root = Some(root);
        Ok(())
    }

    /// The resolved scan root. Falls back to `.` before `initialize`.
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            ignore: self.ignore.clone(),
            alias_prefix: self.alias.clone(),
            strategy: self.parser,
        }
    }
}
