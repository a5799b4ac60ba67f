use clap::ValueEnum;
use serde::Deserialize;

/// How external tool output reaches the terminal.
#[derive(ValueEnum, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Echo tool output live while it runs.
    Stream,
    /// Print each tool's captured output as one block after it exits.
    #[default]
    Group,
}
