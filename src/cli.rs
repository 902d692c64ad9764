// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `specflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "specflow",
    version,
    about = "Compile and run spectroscopy measurement sequences.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the experiment file (TOML).
    ///
    /// Default: `Specflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Specflow.toml")]
    pub config: String,

    /// Tick interval for the cooperative engine, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 50)]
    pub tick_ms: u64,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SPECFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the compiled plan, but don't touch hardware.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
