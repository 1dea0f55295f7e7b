//! Gate decomposition: rules, rule sets and the [`AutoReplacer`] stage.

pub mod replacer;
pub mod rule;
pub mod rules;

pub use replacer::{AutoReplacer, DEFAULT_MAX_DEPTH, DecompositionChooser};
pub use rule::{DecompositionRule, DecompositionRuleSet, RecognizerFn, RewriteFn};
pub use rules::{default_rule_set, default_rules};
