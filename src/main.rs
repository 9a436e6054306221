mod anchors;
mod cache;
mod commands;
mod config;
mod destination;
mod diagnostics;
mod document;
mod error;
mod grammar;
mod hasher;
mod patcher;
mod reconciler;
mod scanner;
mod snapshot;
mod types;
mod validator;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::Format;

/// Exit code for run-fatal errors; 1 is reserved for a dirty check.
const FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "linkmend", about = "Check markdown links and repair them after files move")]
struct Cli {
    /// The command to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Report broken links, missing anchors and unstable anchor references
    Check {
        /// Output format for findings
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Markdown files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Snapshot the tree, or repair links broken by moves since the last snapshot
    Mend {
        /// Directory to scan
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// File holding the saved snapshot
        #[arg(long, short = 'f')]
        state: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { format, paths } => commands::check(&paths, format),
        Commands::Mend { dir, state } => commands::mend(&state, &dir).map(|()| return ExitCode::SUCCESS),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            return ExitCode::from(FATAL);
        },
    };
}
