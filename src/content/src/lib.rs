//! Event content selection for data tiers.
//!
//! Producer subsystems contribute named rule blocks, tiers are composed from
//! those blocks (optionally inheriting another tier's list), and each candidate
//! product is resolved to keep or drop against a tier's composed list.
//!
//! ```text
//! blocks ──► RuleBlockRegistry ──► TierComposer ──► composed rules ──► decide / ProductSelector
//!                                    ▲      │
//!                                    └──────┘ parent tiers
//! ```
//!
//! # Example
//!
//! ```
//! use content::{ProductDescriptor, RuleBlockRegistry, SelectorRule, Tier, TierComposer};
//!
//! let mut registry = RuleBlockRegistry::new();
//! registry
//!     .register("Head", vec!["drop *".parse::<SelectorRule>().unwrap()])
//!     .unwrap();
//! registry
//!     .register("Tracker", vec!["keep recoTracks_*_*_*".parse::<SelectorRule>().unwrap()])
//!     .unwrap();
//!
//! let mut composer = TierComposer::new(registry);
//! composer
//!     .define_tier(Tier::new("RECO").blocks(["Head", "Tracker"]))
//!     .unwrap();
//! composer.freeze().unwrap();
//!
//! let rules = composer.composed_rules("RECO").unwrap();
//! let product = ProductDescriptor::new("recoTracks", "generalTracks", "", "RECO");
//! assert!(content::decide(&rules, &product).is_keep());
//! ```

pub mod composer;
pub mod declarations;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod rule;

pub use composer::{CompositionError, RuleOrigin, Tier, TierComposer, TracedRule};
pub use declarations::{ContentDeclarations, DeclarationError};
pub use registry::{RegistryError, RuleBlock, RuleBlockRegistry};
pub use report::{ProductEntry, SelectionReport};
pub use resolver::{Decision, ProductSelector, Selection, decide};
pub use rule::{Action, Pattern, PatternPart, ProductDescriptor, RuleParseError, SelectorRule};
