//! Selector rules and product descriptors.
//!
//! Rules are written the way subsystem authors declare them in event content
//! blocks: an action followed by a four-part pattern,
//! `keep Type_moduleLabel_instanceLabel_processName`, or `drop *` as shorthand
//! for dropping everything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Token matching any value of a pattern field, including the empty string.
pub const WILDCARD: &str = "*";

/// Separator between the four fields of a pattern or product name.
pub const FIELD_SEPARATOR: char = '_';

/// Whether a matching product is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Keep,
    Drop,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Keep => "keep",
            Action::Drop => "drop",
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Action::Keep)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Action {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Action::Keep),
            "drop" => Ok(Action::Drop),
            other => Err(RuleParseError::UnknownAction(other.to_string())),
        }
    }
}

/// One field of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternPart {
    /// Matches the whole field, whatever its value.
    Any,
    /// Matches the field exactly (case-sensitive).
    Literal(String),
}

impl PatternPart {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            PatternPart::Any => true,
            PatternPart::Literal(literal) => literal == value,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, PatternPart::Any)
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            PatternPart::Any => None,
            PatternPart::Literal(literal) => Some(literal),
        }
    }
}

impl From<&str> for PatternPart {
    fn from(token: &str) -> Self {
        if token == WILDCARD {
            PatternPart::Any
        } else {
            PatternPart::Literal(token.to_string())
        }
    }
}

impl fmt::Display for PatternPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternPart::Any => f.write_str(WILDCARD),
            PatternPart::Literal(literal) => f.write_str(literal),
        }
    }
}

/// Four-part pattern over `(type, moduleLabel, instanceLabel, processName)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub type_name: PatternPart,
    pub module_label: PatternPart,
    pub instance_label: PatternPart,
    pub process_name: PatternPart,
}

impl Pattern {
    pub fn new(
        type_name: impl Into<PatternPart>,
        module_label: impl Into<PatternPart>,
        instance_label: impl Into<PatternPart>,
        process_name: impl Into<PatternPart>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            module_label: module_label.into(),
            instance_label: instance_label.into(),
            process_name: process_name.into(),
        }
    }

    /// Pattern matching every product.
    pub fn any() -> Self {
        Self::new(
            PatternPart::Any,
            PatternPart::Any,
            PatternPart::Any,
            PatternPart::Any,
        )
    }

    pub fn is_any(&self) -> bool {
        self.parts().iter().all(|part| part.is_any())
    }

    pub fn parts(&self) -> [&PatternPart; 4] {
        [
            &self.type_name,
            &self.module_label,
            &self.instance_label,
            &self.process_name,
        ]
    }

    pub fn matches(&self, product: &ProductDescriptor) -> bool {
        self.type_name.matches(&product.type_name)
            && self.module_label.matches(&product.module_label)
            && self.instance_label.matches(&product.instance_label)
            && self.process_name.matches(&product.process_name)
    }
}

impl FromStr for Pattern {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD {
            return Ok(Pattern::any());
        }

        let parts: Vec<&str> = s.split(FIELD_SEPARATOR).collect();
        let [type_name, module_label, instance_label, process_name] = parts[..] else {
            return Err(RuleParseError::WrongArity {
                pattern: s.to_string(),
                parts: parts.len(),
            });
        };

        for token in &parts {
            if *token != WILDCARD && token.contains(WILDCARD) {
                tracing::warn!(
                    pattern = s,
                    token = *token,
                    "pattern token contains '*' but is not a whole-field wildcard; matching it literally"
                );
            }
        }

        let pattern = Pattern::new(type_name, module_label, instance_label, process_name);
        Ok(pattern)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str(WILDCARD);
        }
        write!(
            f,
            "{}_{}_{}_{}",
            self.type_name, self.module_label, self.instance_label, self.process_name
        )
    }
}

/// A keep/drop action paired with the pattern it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SelectorRule {
    pub action: Action,
    pub pattern: Pattern,
}

impl SelectorRule {
    pub fn new(action: Action, pattern: Pattern) -> Self {
        Self { action, pattern }
    }

    pub fn keep(pattern: Pattern) -> Self {
        Self::new(Action::Keep, pattern)
    }

    pub fn drop(pattern: Pattern) -> Self {
        Self::new(Action::Drop, pattern)
    }

    /// `drop *`
    pub fn drop_all() -> Self {
        Self::drop(Pattern::any())
    }

    pub fn matches(&self, product: &ProductDescriptor) -> bool {
        self.pattern.matches(product)
    }

    /// True for `drop *`, which discards every earlier decision.
    pub fn is_blanket_drop(&self) -> bool {
        self.action == Action::Drop && self.pattern.is_any()
    }
}

impl FromStr for SelectorRule {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RuleParseError::MissingAction);
        }

        let (action_token, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let action = action_token.parse::<Action>()?;

        let pattern_text = rest.trim();
        if pattern_text.is_empty() {
            return Err(RuleParseError::MissingPattern(trimmed.to_string()));
        }

        Ok(Self::new(action, pattern_text.parse()?))
    }
}

impl TryFrom<String> for SelectorRule {
    type Error = RuleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SelectorRule> for String {
    fn from(rule: SelectorRule) -> Self {
        rule.to_string()
    }
}

impl fmt::Display for SelectorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.pattern)
    }
}

/// Identity of a candidate data product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub type_name: String,
    pub module_label: String,
    pub instance_label: String,
    pub process_name: String,
}

impl ProductDescriptor {
    pub fn new(
        type_name: impl Into<String>,
        module_label: impl Into<String>,
        instance_label: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            module_label: module_label.into(),
            instance_label: instance_label.into(),
            process_name: process_name.into(),
        }
    }
}

/// Parses the persisted branch form `Type_moduleLabel_instanceLabel_processName`.
/// Empty fields are allowed (`recoTracks_generalTracks__RECO`).
impl FromStr for ProductDescriptor {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let parts: Vec<&str> = name.split(FIELD_SEPARATOR).collect();
        let [type_name, module_label, instance_label, process_name] = parts[..] else {
            return Err(RuleParseError::WrongArity {
                pattern: name.to_string(),
                parts: parts.len(),
            });
        };
        let product = Self::new(type_name, module_label, instance_label, process_name);
        Ok(product)
    }
}

impl fmt::Display for ProductDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.type_name, self.module_label, self.instance_label, self.process_name
        )
    }
}

/// Errors raised while parsing rule or product text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("Rule is empty; expected 'keep <pattern>' or 'drop <pattern>'")]
    MissingAction,

    #[error("Unknown rule action '{0}'; expected 'keep' or 'drop'")]
    UnknownAction(String),

    #[error("Rule '{0}' has no pattern")]
    MissingPattern(String),

    #[error("'{pattern}' has {parts} '_'-separated fields; expected 4")]
    WrongArity { pattern: String, parts: usize },
}
