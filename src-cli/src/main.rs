use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde_json::json;

use revcompare_core::models::{ComparisonRequest, RenderedFile};
use revcompare_core::services::diff::render_file;
use revcompare_core::services::{Comparator, DirectoryRegistry, RepositoryRegistry};
use revcompare_core::{CompareConfig, Reference};

#[derive(Parser)]
#[command(
    name = "rvc",
    about = "Compare changesets between hg or git repositories"
)]
struct Cli {
    /// Directory containing the repositories, addressed by name
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// -v for info, -vv for debug logging (RUST_LOG takes precedence)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two references and print the result as JSON
    Compare {
        /// Repository holding the org reference
        repo: String,

        /// Base reference, e.g. branch:default, book:main, tag:v1.0, rev:1a2b3c
        org_ref: Reference,

        /// Reference to compare against the base
        other_ref: Reference,

        /// Repository holding the other reference (defaults to REPO)
        #[arg(long)]
        other_repo: Option<String>,

        /// Preview what merging the other reference would bring in
        #[arg(long)]
        merge: bool,

        /// Do not truncate large diffs
        #[arg(long)]
        full_diff: bool,

        /// Only list changesets, skip the diff
        #[arg(long, conflicts_with = "render")]
        changesets_only: bool,

        /// Swap org and other
        #[arg(long)]
        swap: bool,

        /// Include highlighted hunks for every file
        #[arg(long)]
        render: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => CompareConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CompareConfig::default(),
    };
    let registry = DirectoryRegistry::new(&cli.root, config.clone());
    let comparator = Comparator::new(config);

    match cli.command {
        Command::Compare {
            repo,
            org_ref,
            other_ref,
            other_repo,
            merge,
            full_diff,
            changesets_only,
            swap,
            render,
        } => {
            let org = registry.get(&repo)?;
            let other = match &other_repo {
                Some(name) => registry.get(name)?,
                None => org.clone(),
            };

            let mut request = ComparisonRequest::new(org, org_ref, other, other_ref)
                .merge(merge)
                .full_diff(full_diff);
            if swap {
                request = request.swapped();
            }

            let output = if changesets_only {
                comparator
                    .compare_changesets(&request)
                    .map(serde_json::to_value)
            } else {
                comparator.compare(&request).map(|result| {
                    if render {
                        let rendered: Vec<RenderedFile> =
                            result.files.iter().map(render_file).collect();
                        Ok(json!({ "result": result, "rendered": rendered }))
                    } else {
                        serde_json::to_value(result)
                    }
                })
            };

            let value = match output {
                Ok(value) => value?,
                Err(e) if e.is_empty_repository() => {
                    log::warn!("{}", e);
                    json!({ "empty": true, "message": e.to_string() })
                }
                Err(e) => return Err(e).context("comparison failed"),
            };

            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}
