use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "catlog",
    version,
    about = "Route JSON log records through schema-validated category loggers"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "catlog.yaml", global = true)]
    pub config: PathBuf,

    /// Path to the category schema (overrides config file setting)
    #[arg(short, long, global = true)]
    pub schema: Option<PathBuf>,

    /// Root directory for file destinations (overrides config file setting)
    #[arg(long, global = true)]
    pub log_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read JSON lines from stdin and log each one (default)
    Run,
    /// Load and validate the schema and transport configuration, then exit
    Check,
}
