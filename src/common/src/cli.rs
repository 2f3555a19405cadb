use clap::Parser;
use std::path::PathBuf;

/// Common CLI arguments shared across all binaries
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Enable quiet mode (minimal output)"
    )]
    pub quiet: bool,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::{CONFIG, Configuration};
    use anyhow::{Context, Result};
    use content::{ContentDeclarations, TierComposer};
    use tracing_subscriber::EnvFilter;

    /// Log filter for the given flags; `RUST_LOG` wins over all of them.
    pub fn log_filter(args: &CommonArgs, config: &Configuration) -> String {
        if let Ok(filter) = std::env::var(EnvFilter::DEFAULT_ENV)
            && !filter.is_empty()
        {
            return filter;
        }
        if args.quiet {
            String::from("warn")
        } else if args.verbose {
            String::from("debug")
        } else {
            config.logging.level.clone()
        }
    }

    /// Initialize logging based on CLI arguments and configuration
    pub fn init_logging(args: &CommonArgs, config: &Configuration) {
        let filter = EnvFilter::try_new(log_filter(args, config))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // A subscriber may already be installed, e.g. when called twice in tests.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Load configuration once and publish it in [`CONFIG`].
    pub fn init_config(config_path: Option<&PathBuf>) -> Result<&'static Configuration> {
        CONFIG.get_or_try_init(|| load_config(config_path))
    }

    /// Load and compose the declarations named by the configuration
    pub fn load_declarations(config: &Configuration) -> Result<TierComposer> {
        let path = &config.content.definitions;
        log::debug!("Loading event content declarations from: {}", path.display());

        ContentDeclarations::from_path(path)
            .and_then(|declarations| declarations.build())
            .with_context(|| format!("Failed to load declarations from {}", path.display()))
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            println!("Event Content Configuration:");
            println!("============================");
            println!("Declarations: {}", config.content.definitions.display());
            println!(
                "Default tier: {}",
                config.content.default_tier.as_deref().unwrap_or("none")
            );
            println!("Log level: {}", config.logging.level);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<TierComposer> {
        log::info!("Validating configuration...");

        if config.content.definitions.as_os_str().is_empty() {
            anyhow::bail!("Declarations path cannot be empty");
        }

        EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("Invalid log level '{}'", config.logging.level))?;

        let composer = load_declarations(config)?;

        if let Some(tier) = &config.content.default_tier
            && composer.tier(tier).is_none()
        {
            anyhow::bail!("Default tier '{tier}' is not defined in the declarations");
        }

        log::info!("✅ Configuration validation passed");
        Ok(composer)
    }

    /// Standard version information
    pub fn version_info() -> String {
        format!(
            "{} {} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_RUST_VERSION")
        )
    }
}
