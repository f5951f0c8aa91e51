use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

#[derive(Parser)]
#[command(name = "sandbox_editor")]
#[command(about = "Sandboxed text file editor driven by JSON commands")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use this config file instead of the default lookup
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sandbox root directory (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Token budget before views are truncated (overrides config)
    #[arg(long, global = true)]
    pub max_tokens: Option<usize>,

    /// Reserve subtracted from the token budget (overrides config)
    #[arg(long, global = true)]
    pub safety_margin: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root: self.root.clone(),
            max_tokens: self.max_tokens,
            safety_margin: self.safety_margin,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Read one JSON request per line from stdin and write one result per line (default)
    Serve,
    /// Handle a single JSON request and print its result
    Exec {
        /// The request, or `-` to read it from stdin
        request: String,
    },
    /// Print the tool name, description and input schema
    Schema,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve
    }
}
