//! QuillDB command-line shell.
//!
//! # Usage
//!
//! ```bash
//! # Start the interactive shell
//! quill
//!
//! # Execute a single command
//! quill -c "set greeting hello"
//!
//! # Use an alternate config file
//! quill --config ./quillrc
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod repl;

use commands::KvExecutor;
use config::CliConfig;
use quill_storage::kv::InMemoryKv;
use repl::Repl;

/// QuillDB interactive shell
#[derive(Parser, Debug)]
#[command(
    name = "quill",
    version,
    about = "Interactive shell for QuillDB",
    long_about = "A line-oriented shell for QuillDB.\n\n\
                  Supports `set <key> <value>` and `get <key>`; type exit or quit to leave."
)]
struct Args {
    /// Execute a single command and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    /// Suppress the banner (for scripting)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::load_default()?,
    };

    let executor = KvExecutor::new(InMemoryKv::new());

    if let Some(command) = &args.command {
        info!("executing command: {command}");
        let output = executor.execute(command)?;
        println!("{output}");
        return Ok(());
    }

    let mut repl = Repl::new(&config, executor)?;
    if !args.quiet {
        repl.print_banner();
    }
    repl.run()
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("quill_cli=debug,quill_storage=debug")
    } else {
        EnvFilter::new("quill_cli=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}
