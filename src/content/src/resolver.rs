//! Keep/drop resolution over a composed rule list.
//!
//! Among all rules matching a product, the one appearing last in the list
//! decides. A product matched by no rule is dropped.

use crate::rule::{Action, ProductDescriptor, SelectorRule};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of resolving one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    /// Index of the deciding rule in the composed list, `None` when nothing matched.
    pub matched_rule: Option<usize>,
}

impl Decision {
    /// Default outcome when no rule applies.
    pub fn unmatched() -> Self {
        Self {
            action: Action::Drop,
            matched_rule: None,
        }
    }

    pub fn is_keep(&self) -> bool {
        self.action.is_keep()
    }
}

/// Resolve `product` against `rules` with last-match-wins precedence.
pub fn decide(rules: &[SelectorRule], product: &ProductDescriptor) -> Decision {
    match rules.iter().rposition(|rule| rule.matches(product)) {
        Some(idx) => Decision {
            action: rules[idx].action,
            matched_rule: Some(idx),
        },
        None => Decision::unmatched(),
    }
}

/// A composed rule list indexed on literal product types.
///
/// Rules whose type field is a literal are only consulted for products of that
/// type; wildcard-type rules are consulted for every product. Both candidate
/// lists are walked from the highest rule index down, so the first match is the
/// last matching rule of the full list, exactly as [`decide`] finds it.
#[derive(Debug, Clone)]
pub struct ProductSelector {
    rules: Arc<[SelectorRule]>,
    by_type: HashMap<String, Vec<usize>>,
    any_type: Vec<usize>,
}

impl ProductSelector {
    pub fn new(rules: impl Into<Arc<[SelectorRule]>>) -> Self {
        let rules: Arc<[SelectorRule]> = rules.into();
        let mut by_type: HashMap<String, Vec<usize>> = HashMap::new();
        let mut any_type = Vec::new();

        for (idx, rule) in rules.iter().enumerate() {
            match rule.pattern.type_name.as_literal() {
                Some(type_name) => by_type.entry(type_name.to_string()).or_default().push(idx),
                None => any_type.push(idx),
            }
        }

        Self {
            rules,
            by_type,
            any_type,
        }
    }

    pub fn rules(&self) -> &[SelectorRule] {
        &self.rules
    }

    pub fn decide(&self, product: &ProductDescriptor) -> Decision {
        let typed = self
            .by_type
            .get(product.type_name.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut typed = typed.iter().rev().copied().peekable();
        let mut untyped = self.any_type.iter().rev().copied().peekable();

        loop {
            let next = match (typed.peek(), untyped.peek()) {
                (Some(&t), Some(&u)) if t > u => typed.next(),
                (Some(_), Some(_)) => untyped.next(),
                (Some(_), None) => typed.next(),
                (None, Some(_)) => untyped.next(),
                (None, None) => None,
            };
            let Some(idx) = next else {
                return Decision::unmatched();
            };

            let rule = &self.rules[idx];
            if rule.matches(product) {
                return Decision {
                    action: rule.action,
                    matched_rule: Some(idx),
                };
            }
        }
    }

    /// Partition `items` into kept and dropped, preserving input order.
    ///
    /// `product_of` picks the descriptor to decide on, so callers can carry
    /// extra data such as sizes alongside each product.
    pub fn select<'a, T, I, F>(&self, items: I, product_of: F) -> Selection<'a, T>
    where
        I: IntoIterator<Item = &'a T>,
        F: Fn(&T) -> &ProductDescriptor,
    {
        let mut selection = Selection::default();
        for item in items {
            let decision = self.decide(product_of(item));
            if decision.is_keep() {
                selection.kept.push((item, decision));
            } else {
                selection.dropped.push((item, decision));
            }
        }
        selection
    }
}

/// Items split by decision.
#[derive(Debug)]
pub struct Selection<'a, T = ProductDescriptor> {
    pub kept: Vec<(&'a T, Decision)>,
    pub dropped: Vec<(&'a T, Decision)>,
}

impl<T> Default for Selection<'_, T> {
    fn default() -> Self {
        Self {
            kept: Vec::new(),
            dropped: Vec::new(),
        }
    }
}
