use std::path::PathBuf;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod tree;

use tree::{LoadedTree, Report};

/// Report output format.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "route-check")]
#[command(about = "Resolve an argument vector against a command tree description")]
struct Cli {
    /// Command tree description (.json, .yaml or .yml).
    #[arg(long)]
    tree: PathBuf,
    /// Output format for the resolution report.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Print the resolved command's usage text instead of the report.
    #[arg(long)]
    usage: bool,
    /// Log filter used when RUST_LOG is unset (e.g. info, debug, trace).
    #[arg(long, default_value = "warn")]
    log_level: String,
    /// Arguments to resolve, without the program name. Put them after `--`
    /// when the first one starts with a dash.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(err) = run_check(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_check(cli: Cli) -> Result<(), String> {
    let mut tree = LoadedTree::load(&cli.tree)
        .map_err(|err| format!("Failed to load '{}': {err}", cli.tree.display()))?;

    let id = match tree.router.resolve(&cli.args) {
        Ok(id) => id,
        Err(err) => {
            debug!(error = %err, kind = ?err.kind(), "resolution failed");
            eprintln!("{}", tree.router.usage(err.command()));
            return Err(err.user_message());
        }
    };

    if cli.usage {
        print!("{}", tree.router.usage(id));
        return Ok(());
    }

    tree.router
        .handle_resolved()
        .map_err(|err| format!("Command failed: {err}"))?;
    print_report(&tree.report(id), cli.format)
}

fn print_report(report: &Report, format: CliOutputFormat) -> Result<(), String> {
    match format {
        CliOutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| format!("Failed to serialize report: {e}"))?;
            println!("{json}");
        }
        CliOutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(report)
                .map_err(|e| format!("Failed to serialize report: {e}"))?;
            print!("{yaml}");
        }
    }
    Ok(())
}
