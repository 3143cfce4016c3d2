// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kioku - an AI chat backend with long-term memory.
//!
//! This is the binary entry point for the kioku server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod serve;

/// Kioku - an AI chat backend with long-term memory.
#[derive(Parser, Debug)]
#[command(name = "kioku", version, about, long_about = None)]
struct Cli {
    /// Path to a config file, bypassing the standard lookup hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the kioku HTTP server.
    Serve,
    /// Print the resolved configuration summary.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => kioku_config::load_and_validate_path(path),
        None => kioku_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            kioku_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("kioku serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            serve::print_config_summary(&config);
        }
        None => {
            println!("kioku: use --help for available commands");
        }
    }
}
