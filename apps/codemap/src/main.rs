use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codemap_core::CancellationToken;
use codemap_graph::Config;
use colored::Colorize;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "codemap")]
#[command(about = "Map the files of a codebase and how they depend on each other", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the dependency graph and print it as JSON
    Graph(Config),
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    debug!("Parsed CLI arguments: {:?}", cli.command);

    let start = Instant::now();

    match cli.command {
        Commands::Graph(mut cfg) => {
            cfg.initialize()?;
            let root = cfg.root();
            let num_threads = rayon::current_num_threads();
            info!("Building graph for {} (using {} threads)", root.display(), num_threads);
            debug!("Config: ignore={:?}, alias={}, parser={:?}", cfg.ignore, cfg.alias, cfg.parser);

            let outcome = codemap_graph::run_scan(&root, cfg.scan_options(), CancellationToken::new())?;
            if outcome.is_cancelled() {
                warn!("Scan was cancelled, output is partial");
            }
            let mut result = outcome.into_result();
            if cfg.no_content {
                result.graph.strip_content();
            }
            let elapsed_ms = start.elapsed().as_millis();

            // The summary goes to stderr so stdout stays valid JSON
            let mut stderr = BufWriter::new(std::io::stderr());

            match &cfg.output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let mut writer = BufWriter::new(file);
                    codemap_graph::write_graph_json(&mut writer, &result.graph, cfg.pretty)?;
                    info!("Wrote graph to {}", path.display());
                }
                None => {
                    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
                    // See https://github.com/rust-lang/rust/issues/60673
                    let mut stdout = BufWriter::new(std::io::stdout());
                    codemap_graph::write_graph_json(&mut stdout, &result.graph, cfg.pretty)?;
                }
            }

            if result.graph.is_empty() {
                codemap_graph::print_nothing_found(&mut stderr, &root)?;
            } else {
                codemap_graph::print_summary(&mut stderr, &result, &root)?;
            }

            writeln!(
                stderr,
                "\n{} Finished in {}ms on {} files (using {} threads).",
                "●".bright_blue(),
                elapsed_ms.to_string().cyan(),
                result.files_analyzed.to_string().cyan(),
                num_threads.to_string().cyan()
            )?;
            stderr.flush()?;

            Ok(())
        }
    }
}
