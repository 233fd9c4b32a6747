//! Command-line entry point for routetypes.
//!
//! Parses flags, sets up logging, runs one build and, with `--watch`, keeps
//! rebuilding on every change under the route directory.

use std::path::PathBuf;

use clap::Parser;
use routetypes_core::{
    BuildError, ConfigOptions, Configuration, WriteOutcome, build, write_artifact,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod watch;

/// Env var holding a log level or a full filter spec.
pub const LOG_ENV: &str = "ROUTETYPES_LOG";

const WORKSPACE_CRATES: [&str; 2] = ["routetypes_core", "routetypes_cli"];

#[derive(Debug, Parser)]
#[command(
    name = "routetypes",
    version,
    about = "Generate request/response type declarations for file-routed API handlers"
)]
struct Cli {
    /// Project root
    #[arg(short, long, value_name = "ROOT")]
    input: Option<PathBuf>,
    /// Output directory for $apis.ts [default: <ROOT>/lib]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Path excluded from route discovery, relative to the root
    #[arg(short = 'p', long, value_name = "PATH")]
    ignore_path: Option<PathBuf>,
    /// tsconfig file name or path [default: tsconfig.json]
    #[arg(long, value_name = "PATH")]
    tsconfig: Option<PathBuf>,
    /// Rebuild whenever a route file is added, changed or deleted
    #[arg(short, long)]
    watch: bool,
}

impl Cli {
    fn options(&self) -> ConfigOptions {
        ConfigOptions {
            root_dir: self.input.clone(),
            output: self.output.clone(),
            ignore_path: self.ignore_path.clone(),
            tsconfig: self.tsconfig.clone(),
        }
    }
}

/// Run the tool with the given arguments (program name first) and return the
/// process exit code.
pub fn run(args: Vec<String>) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            return code;
        }
    };

    init_tracing();

    let config = match Configuration::load(cli.options()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    if let Err(err) = generate(&config) {
        eprintln!("{err}");
        return 1;
    }

    if !cli.watch {
        return 0;
    }

    match watch::run(&config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

/// One build followed by a write. Prints the artifact path when the file
/// content changed.
fn generate(config: &Configuration) -> Result<WriteOutcome, BuildError> {
    let content = build(config)?;
    let outcome = write_artifact(&config.output, &content)?;
    match &outcome {
        WriteOutcome::Written(path) => println!("{} was built successfully", path.display()),
        WriteOutcome::Unchanged(path) => {
            debug!(path = %path.display(), "No changes to write.");
        }
    }
    Ok(outcome)
}

fn init_tracing() {
    let filter = log_filter(std::env::var(LOG_ENV).ok().as_deref());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

/// Filter spec for the subscriber. A plain level is scoped to the workspace
/// crates; anything else is taken as a full `EnvFilter` directive.
fn log_filter(value: Option<&str>) -> String {
    match value {
        Some(level) if is_plain_level(level) => scoped(&level.to_lowercase()),
        Some(spec) if !spec.trim().is_empty() => spec.to_string(),
        _ => scoped("info"),
    }
}

fn scoped(level: &str) -> String {
    WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}
