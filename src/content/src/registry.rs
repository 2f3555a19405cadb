//! Named rule blocks contributed by producer subsystems.

use crate::rule::SelectorRule;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A named, ordered and immutable sequence of selector rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBlock {
    name: String,
    rules: Arc<[SelectorRule]>,
}

impl RuleBlock {
    pub fn new(name: impl Into<String>, rules: impl Into<Arc<[SelectorRule]>>) -> Self {
        Self {
            name: name.into(),
            rules: rules.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[SelectorRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Storage and lookup-by-name for rule blocks.
///
/// Blocks keep their registration order for diagnostics. Once
/// [`freeze`](Self::freeze) has been called the registry is read-only.
#[derive(Debug, Default)]
pub struct RuleBlockRegistry {
    blocks: Vec<Arc<RuleBlock>>,
    by_name: HashMap<String, usize>,
    frozen: bool,
}

impl RuleBlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block under a unique name.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Frozen`] once the build phase is closed
    /// - [`RegistryError::DuplicateName`] if `name` is already registered; the
    ///   registry is left unchanged
    pub fn register(
        &mut self,
        name: impl Into<String>,
        rules: impl Into<Arc<[SelectorRule]>>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.frozen {
            return Err(RegistryError::Frozen { name });
        }
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName { name });
        }

        let block = RuleBlock::new(name.clone(), rules);
        tracing::debug!(block = %name, rules = block.len(), "registered rule block");

        self.by_name.insert(name, self.blocks.len());
        self.blocks.push(Arc::new(block));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<RuleBlock>, RegistryError> {
        self.by_name
            .get(name)
            .map(|&idx| Arc::clone(&self.blocks[idx]))
            .ok_or_else(|| RegistryError::UnknownName {
                name: name.to_string(),
            })
    }

    /// Registered names in insertion order.
    pub fn list(&self) -> Vec<&str> {
        self.blocks.iter().map(|block| block.name()).collect()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &RuleBlock> {
        self.blocks.iter().map(|block| block.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Close the build phase; later registrations fail with `Frozen`.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Rule block '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("Rule block '{name}' is not registered")]
    UnknownName { name: String },

    #[error("Cannot register rule block '{name}': registry is frozen")]
    Frozen { name: String },
}
