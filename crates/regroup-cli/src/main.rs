#![forbid(unsafe_code)]

mod cmd;
mod http;
mod indicator;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use regroup_core::config::{ConfigOverrides, resolve_config};
use regroup_core::error::ErrorCode;
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "regroup: review and change how issues are grouped",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (same as `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Suppress progress messages.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Base URL of the issue service API.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Organization slug.
    #[arg(long, global = true)]
    org: Option<String>,

    /// Project slug or id.
    #[arg(long, global = true)]
    project: Option<String>,

    /// Page cursor from a previous listing.
    #[arg(long, global = true)]
    cursor: Option<String>,

    /// Page size for listings.
    #[arg(long, global = true)]
    limit: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_url: self.api_url.clone(),
            organization: self.org.clone(),
            project: self.project.clone(),
            limit: self.limit,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Read",
        about = "List fingerprints merged into an issue",
        long_about = "List the fingerprint hashes merged into an issue with event counts and the latest event.",
        after_help = "EXAMPLES:\n    # List merged fingerprints\n    regroup merged 1234\n\n    # Next page\n    regroup merged 1234 --cursor 0:50:0\n\n    # Emit machine-readable output\n    regroup merged 1234 --format json"
    )]
    Merged(cmd::merged::MergedArgs),

    #[command(
        next_help_heading = "Read",
        about = "List issues similar to an issue",
        long_about = "List issues the service scores as similar, hiding those below the similarity threshold.",
        after_help = "EXAMPLES:\n    # Similar issues above the threshold\n    regroup similar 1234\n\n    # Include low-scoring issues\n    regroup similar 1234 --all"
    )]
    Similar(cmd::similar::SimilarArgs),

    #[command(
        next_help_heading = "Change",
        about = "Split fingerprints out of an issue",
        long_about = "Queue fingerprints for unmerging into a new issue. At least one fingerprint must stay behind.",
        after_help = "EXAMPLES:\n    # Unmerge two fingerprints\n    regroup unmerge 1234 a1b2c3 d4e5f6"
    )]
    Unmerge(cmd::unmerge::UnmergeArgs),

    #[command(
        next_help_heading = "Change",
        about = "Merge similar issues into an issue",
        long_about = "Merge issues listed by `regroup similar` together with the given issue.",
        after_help = "EXAMPLES:\n    # Merge two similar issues\n    regroup merge 1234 5678 9012 --org acme --project web"
    )]
    Merge(cmd::merge::MergeArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Show the effective configuration",
        after_help = "EXAMPLES:\n    # Show resolved settings\n    regroup config\n\n    # Emit machine-readable output\n    regroup config --format json"
    )]
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("REGROUP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "regroup=debug,info"
        } else {
            "regroup=info,warn"
        })
    });

    let format = env::var("REGROUP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = resolve_output_mode(cli.format, cli.json);
    let project_root = env::current_dir()?;

    let config = match resolve_config(&project_root, &cli.overrides()) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(format!("{err:#}"), ErrorCode::ConfigParseError),
            )?;
            return Err(err);
        }
    };
    debug!(
        api_url = ?config.base_url,
        organization = ?config.organization,
        project = ?config.project,
        "configuration resolved"
    );

    let session = cmd::Session {
        config,
        output,
        quiet: cli.quiet,
        cursor: cli.cursor,
    };

    match cli.command {
        Commands::Merged(ref args) => cmd::merged::run_merged(args, &session),
        Commands::Similar(ref args) => cmd::similar::run_similar(args, &session),
        Commands::Unmerge(ref args) => cmd::unmerge::run_unmerge(args, &session),
        Commands::Merge(ref args) => cmd::merge::run_merge(args, &session),
        Commands::Config => cmd::config::run_config(&session),
    }
}
