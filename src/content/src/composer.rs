//! Tier composition.
//!
//! A tier's composed rule list is its parent's composed list, followed by the
//! rules of each referenced block in declared order, followed by the tier's own
//! local rules. Composition happens once per tier; the result is cached and
//! shared read-only afterwards.

use crate::registry::{RegistryError, RuleBlockRegistry};
use crate::resolver::ProductSelector;
use crate::rule::SelectorRule;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::iter;
use std::sync::Arc;
use thiserror::Error;

/// Declaration of a data tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    name: String,
    parent: Option<String>,
    blocks: Vec<String>,
    local_rules: Vec<SelectorRule>,
}

impl Tier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            blocks: Vec::new(),
            local_rules: Vec::new(),
        }
    }

    /// Prepend the parent's composed list.
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn block(mut self, block: impl Into<String>) -> Self {
        self.blocks.push(block.into());
        self
    }

    pub fn blocks<I, S>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocks.extend(blocks.into_iter().map(Into::into));
        self
    }

    pub fn rule(mut self, rule: SelectorRule) -> Self {
        self.local_rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = SelectorRule>) -> Self {
        self.local_rules.extend(rules);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn block_refs(&self) -> &[String] {
        &self.blocks
    }

    pub fn local_rules(&self) -> &[SelectorRule] {
        &self.local_rules
    }
}

/// Where a composed rule came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Contributed by a registered rule block.
    Block(String),
    /// Declared directly on a tier.
    Local(String),
}

impl fmt::Display for RuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOrigin::Block(name) => f.write_str(name),
            RuleOrigin::Local(tier) => write!(f, "{tier} (local)"),
        }
    }
}

/// A composed rule annotated with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TracedRule {
    pub origin: RuleOrigin,
    pub rule: SelectorRule,
}

#[derive(Debug)]
struct ComposedTier {
    rules: Arc<[SelectorRule]>,
    origins: Arc<[RuleOrigin]>,
}

#[derive(Debug)]
struct TierEntry {
    tier: Tier,
    composed: OnceCell<ComposedTier>,
}

/// Builds and caches the composed rule list of each tier.
///
/// Build phase: register blocks, define tiers, then [`freeze`](Self::freeze).
/// Reads (`composed_rules`, `describe`, `selector`) take `&self` and are safe to
/// share across threads.
#[derive(Debug, Default)]
pub struct TierComposer {
    registry: RuleBlockRegistry,
    tiers: Vec<TierEntry>,
    by_name: HashMap<String, usize>,
    frozen: bool,
}

impl TierComposer {
    pub fn new(registry: RuleBlockRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &RuleBlockRegistry {
        &self.registry
    }

    pub fn register_block(
        &mut self,
        name: impl Into<String>,
        rules: impl Into<Arc<[SelectorRule]>>,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, rules)
    }

    /// Define a tier.
    ///
    /// Block references are checked against the registry immediately. The
    /// declared parent chain is walked to reject cycles. When every tier in the
    /// parent chain is already defined the tier is composed right away;
    /// otherwise composition happens on first read or on [`freeze`](Self::freeze).
    ///
    /// # Errors
    ///
    /// - [`CompositionError::Frozen`] after the build phase is closed
    /// - [`CompositionError::DuplicateTier`] if the name is taken
    /// - [`CompositionError::UnknownBlock`] for an unregistered block reference
    /// - [`CompositionError::CyclicComposition`] if the parent chain loops back
    ///
    /// On error nothing is recorded.
    pub fn define_tier(&mut self, tier: Tier) -> Result<Tier, CompositionError> {
        if self.frozen {
            return Err(CompositionError::Frozen {
                tier: tier.name.clone(),
            });
        }
        if self.by_name.contains_key(&tier.name) {
            return Err(CompositionError::DuplicateTier {
                name: tier.name.clone(),
            });
        }
        if let Some(block) = tier
            .blocks
            .iter()
            .find(|block| !self.registry.contains(block))
        {
            return Err(CompositionError::UnknownBlock {
                tier: tier.name.clone(),
                block: block.clone(),
            });
        }
        self.check_parent_chain(&tier)?;

        let name = tier.name.clone();
        self.by_name.insert(name.clone(), self.tiers.len());
        self.tiers.push(TierEntry {
            tier: tier.clone(),
            composed: OnceCell::new(),
        });

        if self.parent_chain_defined(&name) {
            let composed = self.compose(&name).map(|_| ());
            if let Err(err) = composed {
                self.tiers.pop();
                self.by_name.remove(&name);
                return Err(err);
            }
        } else {
            tracing::debug!(
                tier = %name,
                parent = tier.parent().unwrap_or_default(),
                "parent tier not defined yet; composition deferred"
            );
        }

        Ok(tier)
    }

    /// The cached composed rule list of `name`.
    pub fn composed_rules(&self, name: &str) -> Result<Arc<[SelectorRule]>, CompositionError> {
        let composed = self.compose(name)?;
        Ok(Arc::clone(&composed.rules))
    }

    /// The composed list of `name` with each rule mapped to its origin.
    pub fn describe(&self, name: &str) -> Result<Vec<TracedRule>, CompositionError> {
        let composed = self.compose(name)?;
        Ok(composed
            .origins
            .iter()
            .zip(composed.rules.iter())
            .map(|(origin, rule)| TracedRule {
                origin: origin.clone(),
                rule: rule.clone(),
            })
            .collect())
    }

    /// Indexed selector over the composed list of `name`.
    pub fn selector(&self, name: &str) -> Result<ProductSelector, CompositionError> {
        self.composed_rules(name).map(ProductSelector::new)
    }

    /// Positions of `drop *` rules after the head of the composed list.
    ///
    /// Such a rule discards every decision made by the rules before it, which
    /// is how debug blocks restart selection.
    pub fn blanket_resets(&self, name: &str) -> Result<Vec<usize>, CompositionError> {
        let composed = self.compose(name)?;
        Ok(composed
            .rules
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, rule)| rule.is_blanket_drop())
            .map(|(idx, _)| idx)
            .collect())
    }

    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.entry(name).map(|entry| &entry.tier)
    }

    /// Tier names in definition order.
    pub fn tiers(&self) -> Vec<&str> {
        self.tiers.iter().map(|entry| entry.tier.name()).collect()
    }

    /// Compose every tier and close the build phase.
    ///
    /// If any tier fails to compose the error is returned and the composer
    /// stays open.
    pub fn freeze(&mut self) -> Result<(), CompositionError> {
        for entry in &self.tiers {
            self.compose(entry.tier.name())?;
        }
        self.frozen = true;
        self.registry.freeze();
        tracing::debug!(
            blocks = self.registry.len(),
            tiers = self.tiers.len(),
            "tier composition frozen"
        );
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn entry(&self, name: &str) -> Option<&TierEntry> {
        self.by_name.get(name).map(|&idx| &self.tiers[idx])
    }

    fn check_parent_chain(&self, tier: &Tier) -> Result<(), CompositionError> {
        let mut visiting: HashSet<&str> = HashSet::from([tier.name()]);
        let mut path = vec![tier.name().to_string()];
        let mut current = tier.parent();

        while let Some(parent) = current {
            path.push(parent.to_string());
            if !visiting.insert(parent) {
                return Err(CompositionError::CyclicComposition {
                    tier: tier.name().to_string(),
                    cycle: path,
                });
            }
            current = self.entry(parent).and_then(|entry| entry.tier.parent());
        }
        Ok(())
    }

    fn parent_chain_defined(&self, name: &str) -> bool {
        let mut current = self.entry(name).and_then(|entry| entry.tier.parent());
        while let Some(parent) = current {
            match self.entry(parent) {
                Some(entry) => current = entry.tier.parent(),
                None => return false,
            }
        }
        true
    }

    fn compose(&self, name: &str) -> Result<&ComposedTier, CompositionError> {
        let mut visiting = Vec::new();
        self.compose_with(name, None, &mut visiting)
    }

    fn compose_with(
        &self,
        name: &str,
        referenced_by: Option<&str>,
        visiting: &mut Vec<String>,
    ) -> Result<&ComposedTier, CompositionError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| CompositionError::UnknownTier {
                name: name.to_string(),
                referenced_by: referenced_by.map(str::to_string),
            })?;

        if let Some(composed) = entry.composed.get() {
            return Ok(composed);
        }

        if visiting.iter().any(|tier| tier == name) {
            let mut cycle = visiting.clone();
            cycle.push(name.to_string());
            return Err(CompositionError::CyclicComposition {
                tier: visiting[0].clone(),
                cycle,
            });
        }
        visiting.push(name.to_string());

        let mut rules: Vec<SelectorRule> = Vec::new();
        let mut origins: Vec<RuleOrigin> = Vec::new();

        if let Some(parent) = entry.tier.parent() {
            let inherited = self.compose_with(parent, Some(name), visiting)?;
            rules.extend_from_slice(&inherited.rules);
            origins.extend_from_slice(&inherited.origins);
        }

        for block_name in entry.tier.block_refs() {
            let block = self
                .registry
                .lookup(block_name)
                .map_err(|_| CompositionError::UnknownBlock {
                    tier: name.to_string(),
                    block: block_name.clone(),
                })?;
            rules.extend_from_slice(block.rules());
            let origin = RuleOrigin::Block(block_name.clone());
            origins.extend(iter::repeat_n(origin, block.len()));
        }

        let local = entry.tier.local_rules();
        rules.extend_from_slice(local);
        let origin = RuleOrigin::Local(name.to_string());
        origins.extend(iter::repeat_n(origin, local.len()));

        visiting.pop();

        tracing::debug!(tier = %name, rules = rules.len(), "composed tier");

        Ok(entry.composed.get_or_init(|| ComposedTier {
            rules: rules.into(),
            origins: origins.into(),
        }))
    }
}

/// Errors raised while defining or composing tiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Tier '{name}' is already defined")]
    DuplicateTier { name: String },

    #[error("Tier '{tier}' references unknown rule block '{block}'")]
    UnknownBlock { tier: String, block: String },

    #[error("Tier '{name}' is not defined{}", referenced_by_suffix(.referenced_by))]
    UnknownTier {
        name: String,
        referenced_by: Option<String>,
    },

    #[error("Cyclic composition while defining tier '{tier}': {}", .cycle.join(" -> "))]
    CyclicComposition { tier: String, cycle: Vec<String> },

    #[error("Cannot define tier '{tier}': composer is frozen")]
    Frozen { tier: String },
}

fn referenced_by_suffix(referenced_by: &Option<String>) -> String {
    referenced_by
        .as_ref()
        .map(|tier| format!(" (parent of '{tier}')"))
        .unwrap_or_default()
}
