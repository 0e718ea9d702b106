//! assetline - incremental asset pipeline for static sites.

use anyhow::{Result, anyhow};
use assetline::{
    PipelineError, SiteConfig,
    cli::{Cli, Commands, build::build_assets, clean::clean_cache},
    config::find_config_file,
    logger, state,
};
use clap::{ColorChoice, Parser};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    state::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config_path = find_config_file(&cli.config).ok_or_else(|| {
        anyhow!(
            "config file '{}' not found in this directory or any parent",
            cli.config.display()
        )
    })?;
    let mut config = SiteConfig::load(&config_path)?;

    let result = match &cli.command {
        Commands::Build { build_args } => {
            config.apply_build_args(build_args);
            build_assets(&config, build_args).map(|_| ())
        }
        Commands::Clean => clean_cache(&config),
    };

    if let Err(e) = &result
        && matches!(e.downcast_ref::<PipelineError>(), Some(PipelineError::Interrupted))
    {
        std::process::exit(130);
    }
    result
}
