use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quill", about = "Quill comment storage daemon and tools", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "quill.toml")]
    pub config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the storage RPC server
    Serve(ServeArgs),
    /// List posts of a site with their comment counters
    Posts(PostsArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured listen address
    #[arg(long)]
    pub bind: Option<String>,
    /// Keep comments in memory instead of on disk
    #[arg(long)]
    pub memory: bool,
}

#[derive(Args)]
pub struct PostsArgs {
    pub site: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long, default_value = "0")]
    pub skip: usize,
    /// Query a running server instead of opening the store directly
    #[arg(long)]
    pub remote: bool,
}
