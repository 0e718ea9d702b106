//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Incremental asset pipeline for static sites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: assetline.toml, searched upward from cwd)
    #[arg(short = 'C', long, default_value = "assetline.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print cache decisions and other debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Convert, bundle and publish assets
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Remove the asset cache, forcing a full rebuild next time
    Clean,
}

/// Build command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Clear the asset cache before building
    #[arg(short, long)]
    pub clean: bool,

    /// Fail the build when any asset fails to convert
    #[arg(short, long)]
    pub strict: bool,

    /// Number of conversion threads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Hide the progress line and summary
    #[arg(short, long)]
    pub quiet: bool,
}
