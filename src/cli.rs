use std::path::PathBuf;

use clap::Parser;

use crate::{config::DEFAULT_CONFIG_FILE, output::OutputMode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project configuration file to use
    #[arg(short = 'f', long = "file", default_value = DEFAULT_CONFIG_FILE)]
    pub file: PathBuf,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Show what would be executed without running any step
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// List every task with its description and dependencies
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// How to display external tool output in the terminal
    #[arg(long = "output", value_enum)]
    pub output: Option<OutputMode>,

    /// Task to run, runs "default" if not specified
    pub task: Option<String>,
}
