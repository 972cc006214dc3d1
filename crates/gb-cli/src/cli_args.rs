use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gb-cli")]
#[command(about = "Load a guest script into a fresh interpreter and call into it")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "script")]
    pub(crate) script: PathBuf,
    /// Scope name; defaults to the script's file stem.
    #[arg(long = "name")]
    pub(crate) name: Option<String>,
    #[arg(long = "module-path")]
    pub(crate) module_path: Vec<PathBuf>,
    /// `name=<json>` binding injected before the script runs.
    #[arg(long = "global")]
    pub(crate) global: Vec<String>,
    #[arg(long = "call")]
    pub(crate) call: Option<String>,
    #[arg(long = "arg", requires = "call", allow_hyphen_values = true)]
    pub(crate) arg: Vec<String>,
    /// Injects a `Logger` callback global and reports its last message.
    #[arg(long = "with-logger")]
    pub(crate) with_logger: bool,
}
