//! Static event content declarations loaded from TOML.
//!
//! ```toml
//! [[block]]
//! name = "L1TriggerRAW"
//! producer = "L1Trigger"
//! rules = ["keep FEDRawDataCollection_rawDataCollector_*_*"]
//!
//! [[tier]]
//! name = "RAWSIM"
//! inherits = "RAW"
//! blocks = ["SimG4CoreRAW"]
//! ```
//!
//! Blocks are registered and tiers defined in file order.

use crate::composer::{CompositionError, Tier, TierComposer};
use crate::registry::{RegistryError, RuleBlockRegistry};
use crate::rule::{RuleParseError, SelectorRule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentDeclarations {
    #[serde(default, rename = "block")]
    pub blocks: Vec<BlockDeclaration>,
    #[serde(default, rename = "tier")]
    pub tiers: Vec<TierDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDeclaration {
    pub name: String,
    /// Subsystem contributing the block, for diagnostics.
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDeclaration {
    pub name: String,
    #[serde(default)]
    pub inherits: Option<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl ContentDeclarations {
    pub fn from_toml(toml_str: &str) -> Result<Self, DeclarationError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DeclarationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DeclarationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Register every block, define every tier and freeze the result.
    pub fn build(&self) -> Result<TierComposer, DeclarationError> {
        let mut registry = RuleBlockRegistry::new();
        for block in &self.blocks {
            let rules = parse_rules(&block.rules, || format!("block '{}'", block.name))?;
            registry.register(block.name.clone(), rules)?;
        }

        let mut composer = TierComposer::new(registry);
        for tier in &self.tiers {
            let rules = parse_rules(&tier.rules, || format!("tier '{}'", tier.name))?;
            let mut definition = Tier::new(tier.name.clone())
                .blocks(tier.blocks.iter().cloned())
                .rules(rules);
            if let Some(parent) = &tier.inherits {
                definition = definition.inherits(parent.clone());
            }
            composer.define_tier(definition)?;
        }

        composer.freeze()?;
        tracing::info!(
            blocks = self.blocks.len(),
            tiers = self.tiers.len(),
            "loaded event content declarations"
        );
        Ok(composer)
    }
}

fn parse_rules(
    texts: &[String],
    owner: impl Fn() -> String,
) -> Result<Vec<SelectorRule>, DeclarationError> {
    texts
        .iter()
        .map(|text| {
            text.parse::<SelectorRule>()
                .map_err(|source| DeclarationError::InvalidRule {
                    owner: owner(),
                    rule: text.clone(),
                    source,
                })
        })
        .collect()
}

#[derive(Error, Debug)]
pub enum DeclarationError {
    #[error("Failed to read declarations from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse declarations TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid rule '{rule}' in {owner}: {source}")]
    InvalidRule {
        owner: String,
        rule: String,
        #[source]
        source: RuleParseError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Composition(#[from] CompositionError),
}
