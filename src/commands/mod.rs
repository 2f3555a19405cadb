pub mod inspect;
pub mod select;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::cli::{CommonArgs, utils};
use common::config::Configuration;
use content::TierComposer;

/// Inspect and apply event content tiers
#[derive(Parser)]
#[command(name = "eventcontent", version, about)]
pub struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered rule blocks
    Blocks,
    /// List tiers with their parent and composed rule count
    Tiers,
    /// Show the composed rule list of a tier and where each rule came from
    Describe {
        /// Tier name
        tier: String,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    /// Decide keep or drop for individual products
    Decide {
        /// Tier name, defaults to `content.default_tier`
        #[arg(long)]
        tier: Option<String>,
        /// Products as `Type_module_instance_process`
        #[arg(required = true)]
        products: Vec<String>,
    },
    /// Report which products a tier keeps, largest first
    Select {
        /// Tier name, defaults to `content.default_tier`
        #[arg(long)]
        tier: Option<String>,
        /// File with one `<product> [bytes]` per line; stdin when omitted
        #[arg(long)]
        input: Option<std::path::PathBuf>,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    /// Load and compose every tier, reporting suspicious rule lists
    Validate,
    /// Show the effective configuration
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = utils::init_config(self.common.config.as_ref())?;
        utils::init_logging(&self.common, config);
        tracing::debug!(version = %utils::version_info(), "starting");

        match self.command {
            Commands::Config { json } => utils::display_config(config, json),
            Commands::Validate => inspect::validate(config),
            Commands::Blocks => inspect::blocks(&utils::load_declarations(config)?),
            Commands::Tiers => inspect::tiers(&utils::load_declarations(config)?),
            Commands::Describe { tier, json } => {
                inspect::describe(&utils::load_declarations(config)?, &tier, json)
            }
            Commands::Decide { tier, products } => {
                let tier = required_tier(config, tier)?;
                select::decide(&utils::load_declarations(config)?, &tier, &products)
            }
            Commands::Select { tier, input, json } => {
                let tier = required_tier(config, tier)?;
                let composer = utils::load_declarations(config)?;
                select::select(&composer, &tier, input.as_deref(), json)
            }
        }
    }
}

fn required_tier(config: &Configuration, explicit: Option<String>) -> anyhow::Result<String> {
    config
        .resolve_tier(explicit.as_deref())
        .context("No tier given; pass --tier or set content.default_tier")
}

fn selector(composer: &TierComposer, tier: &str) -> anyhow::Result<content::ProductSelector> {
    composer
        .selector(tier)
        .with_context(|| format!("Cannot select with tier '{tier}'"))
}
