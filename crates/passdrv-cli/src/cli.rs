use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "passdrv",
    about = "Read and write gpg-encrypted secrets in a pass-style store",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Store root directory (overrides config and discovery).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// Recipient key identifier used for encryption.
    #[arg(long, global = true)]
    pub key: Option<String>,
    /// Config file to load instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List secret IDs in the store root.
    #[command(alias = "ls")]
    List,
    /// Print a decrypted secret to stdout.
    Show { id: String },
    /// Store a new secret read from stdin.
    Insert { id: String },
    /// Delete a secret.
    #[command(alias = "delete")]
    Rm { id: String },
    /// Show the resolved root and key and check the store is readable.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
