//! Decomposition rules and rule sets.

use std::fmt;
use std::sync::Arc;

use kestrel_ir::{Command, GateClass};
use rustc_hash::FxHashMap;

use crate::error::CompileResult;

/// Rewrites a command into an equivalent sequence.
pub type RewriteFn = Arc<dyn Fn(&Command) -> CompileResult<Vec<Command>> + Send + Sync>;

/// Decides whether a rule applies to a command.
pub type RecognizerFn = Arc<dyn Fn(&Command) -> bool + Send + Sync>;

/// A rewrite for one gate class, with an optional applicability predicate.
#[derive(Clone)]
pub struct DecompositionRule {
    class: GateClass,
    name: String,
    rewrite: RewriteFn,
    recognizer: Option<RecognizerFn>,
    negative_controls: bool,
}

impl DecompositionRule {
    /// A rule for `class` that applies to every command of that class.
    pub fn new(
        class: GateClass,
        name: impl Into<String>,
        rewrite: impl Fn(&Command) -> CompileResult<Vec<Command>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            class,
            name: name.into(),
            rewrite: Arc::new(rewrite),
            recognizer: None,
            negative_controls: false,
        }
    }

    /// Restrict the rule to commands matching `recognizer`.
    #[must_use]
    pub fn with_recognizer(
        mut self,
        recognizer: impl Fn(&Command) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.recognizer = Some(Arc::new(recognizer));
        self
    }

    /// Mark the rule as handling negative control patterns. Such rules are
    /// tried before any other candidate.
    #[must_use]
    pub fn for_negative_controls(mut self) -> Self {
        self.negative_controls = true;
        self
    }

    /// The gate class this rule is registered for.
    pub fn class(&self) -> &GateClass {
        &self.class
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the rule targets negative control patterns.
    pub fn targets_negative_controls(&self) -> bool {
        self.negative_controls
    }

    /// Whether the rule applies to `cmd`.
    pub fn recognizes(&self, cmd: &Command) -> bool {
        self.recognizer.as_ref().is_none_or(|f| f(cmd))
    }

    /// Rewrite `cmd`.
    pub fn rewrite(&self, cmd: &Command) -> CompileResult<Vec<Command>> {
        (self.rewrite)(cmd)
    }
}

impl fmt::Debug for DecompositionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecompositionRule")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("negative_controls", &self.negative_controls)
            .finish()
    }
}

/// Rules indexed by gate class, in registration order.
///
/// Every registration rebuilds a lookup table that lists, for each gate
/// class, the rules along its class chain (see [`kestrel_ir::Gate::ancestry`])
/// grouped per level, most specific first. Lookup stops at the first level
/// with a rule that recognizes the command. Share a finished set between
/// stages through an `Arc`; it is not mutated once a pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct DecompositionRuleSet {
    rules: FxHashMap<GateClass, Vec<DecompositionRule>>,
    /// Rule levels per `(class, is_math)` of a gate.
    lookup: FxHashMap<(GateClass, bool), Vec<Vec<DecompositionRule>>>,
    /// Levels for custom gates without rules of their own, by `is_math`.
    unnamed: [Vec<Vec<DecompositionRule>>; 2],
}

impl DecompositionRuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule set from rules.
    pub fn from_rules(rules: impl IntoIterator<Item = DecompositionRule>) -> Self {
        let mut set = Self::new();
        set.add_rules(rules);
        set
    }

    /// Register a rule after the existing rules of its class.
    pub fn add_rule(&mut self, rule: DecompositionRule) {
        self.add_rules([rule]);
    }

    /// Register several rules.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = DecompositionRule>) {
        for rule in rules {
            self.rules.entry(rule.class.clone()).or_default().push(rule);
        }
        self.reindex();
    }

    /// Append every rule of `other`.
    pub fn merge(&mut self, other: &DecompositionRuleSet) {
        for (class, rules) in &other.rules {
            self.rules
                .entry(class.clone())
                .or_default()
                .extend(rules.iter().cloned());
        }
        self.reindex();
    }

    fn reindex(&mut self) {
        let mut keys: Vec<(GateClass, bool)> =
            GateClass::BUILTIN.into_iter().map(|class| (class, false)).collect();
        for class in self.rules.keys() {
            if let GateClass::Custom(_) = class {
                keys.push((class.clone(), false));
                keys.push((class.clone(), true));
            }
        }
        let lookup: FxHashMap<_, _> = keys
            .into_iter()
            .map(|(class, math)| {
                let levels = self.levels(&class.ancestry(math));
                ((class, math), levels)
            })
            .collect();
        let unnamed = [false, true].map(|math| {
            let chain = GateClass::Custom(String::new()).ancestry(math);
            self.levels(&chain[1..])
        });
        self.lookup = lookup;
        self.unnamed = unnamed;
    }

    fn levels(&self, chain: &[GateClass]) -> Vec<Vec<DecompositionRule>> {
        chain
            .iter()
            .filter_map(|class| self.rules.get(class))
            .filter(|rules| !rules.is_empty())
            .cloned()
            .collect()
    }

    /// Rule levels that apply to `cmd`, most specific first.
    fn levels_for(&self, cmd: &Command) -> &[Vec<DecompositionRule>] {
        let gate = cmd.gate();
        let math = gate.is_math();
        self.lookup
            .get(&(gate.class(), math))
            .unwrap_or(&self.unnamed[usize::from(math)])
    }

    /// Rules registered directly for `class`.
    pub fn rules_for(&self, class: &GateClass) -> &[DecompositionRule] {
        self.rules.get(class).map(Vec::as_slice).unwrap_or_default()
    }

    /// Recognizing rules of the most specific class that has any.
    pub fn candidates(&self, cmd: &Command) -> Vec<&DecompositionRule> {
        self.levels_for(cmd)
            .iter()
            .map(|level| level.iter().filter(|rule| rule.recognizes(cmd)).collect::<Vec<_>>())
            .find(|matching| !matching.is_empty())
            .unwrap_or_default()
    }

    /// The first recognizing rule for negative control patterns anywhere in
    /// the class chain, if the command has any negative control.
    pub fn negative_control_rule(&self, cmd: &Command) -> Option<&DecompositionRule> {
        if !cmd.has_negative_controls() {
            return None;
        }
        self.levels_for(cmd)
            .iter()
            .flatten()
            .find(|rule| rule.targets_negative_controls() && rule.recognizes(cmd))
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Whether the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ir::{CustomGate, Gate, QubitId};

    fn some_gate() -> Command {
        Command::single(Gate::Custom(CustomGate::new("some_gate")), QubitId(0))
    }

    fn to(gate: Gate) -> impl Fn(&Command) -> CompileResult<Vec<Command>> + Send + Sync {
        move |cmd| Ok(vec![Command::single(gate.clone(), cmd.target().unwrap_or(QubitId(0)))])
    }

    #[test]
    fn test_incremental_registration_keeps_order() {
        let class = GateClass::Custom("some_gate".into());
        let mut set = DecompositionRuleSet::new();
        set.add_rule(DecompositionRule::new(class.clone(), "to_x", to(Gate::X)));
        set.add_rule(DecompositionRule::new(class.clone(), "to_h", to(Gate::H)));
        assert_eq!(set.rules_for(&class).len(), 2);

        let names: Vec<&str> = set.candidates(&some_gate()).iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["to_x", "to_h"]);
    }

    #[test]
    fn test_falls_back_to_parent_class() {
        let set = DecompositionRuleSet::from_rules([DecompositionRule::new(
            GateClass::Rotation,
            "any_rotation",
            to(Gate::H),
        )]);
        let cmd = Command::single(Gate::Rz(0.3), QubitId(1));
        assert_eq!(set.candidates(&cmd).len(), 1);
        assert!(set.candidates(&Command::single(Gate::H, QubitId(1))).is_empty());
    }

    #[test]
    fn test_recognizer_filters_before_fallback() {
        let set = DecompositionRuleSet::from_rules([
            DecompositionRule::new(GateClass::X, "never", to(Gate::H)).with_recognizer(|_| false),
            DecompositionRule::new(GateClass::Basic, "generic", to(Gate::Z)),
        ]);
        let candidates = set.candidates(&Command::single(Gate::X, QubitId(0)));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name(), "generic");
    }

    #[test]
    fn test_negative_control_rule() {
        let set = DecompositionRuleSet::from_rules([
            DecompositionRule::new(GateClass::X, "cnot", to(Gate::Z)),
            DecompositionRule::new(GateClass::Basic, "flip", to(Gate::X))
                .with_recognizer(Command::has_negative_controls)
                .for_negative_controls(),
        ]);
        let positive = Command::cnot(QubitId(0), QubitId(1));
        assert!(set.negative_control_rule(&positive).is_none());

        let negative = Command::single(Gate::X, QubitId(1))
            .with_control_state(&[QubitId(0)], kestrel_ir::ControlState::parse("0").unwrap())
            .unwrap();
        assert_eq!(set.negative_control_rule(&negative).unwrap().name(), "flip");
    }

    #[test]
    fn test_lookup_includes_inherited_rules() {
        let mut set = DecompositionRuleSet::from_rules([
            DecompositionRule::new(GateClass::X, "x_first", to(Gate::Z)).with_recognizer(|_| false),
            DecompositionRule::new(GateClass::SelfInverse, "self_inverse", to(Gate::H)),
        ]);
        let x = Command::single(Gate::X, QubitId(0));
        assert_eq!(set.candidates(&x)[0].name(), "self_inverse");
        assert!(set.candidates(&some_gate()).is_empty());

        // Rules added later for a parent show up for every descendant.
        set.merge(&DecompositionRuleSet::from_rules([DecompositionRule::new(
            GateClass::Basic,
            "anything",
            to(Gate::H),
        )]));
        assert_eq!(set.candidates(&some_gate())[0].name(), "anything");
        let adder = Command::single(
            Gate::Custom(CustomGate::math("add", |r| r.to_vec())),
            QubitId(0),
        );
        assert_eq!(set.candidates(&adder)[0].name(), "anything");

        set.add_rule(DecompositionRule::new(GateClass::Math, "math", to(Gate::X)));
        assert_eq!(set.candidates(&adder)[0].name(), "math");
        assert_eq!(set.candidates(&some_gate())[0].name(), "anything");
    }

    #[test]
    fn test_merge_sets() {
        let mut a = DecompositionRuleSet::from_rules([DecompositionRule::new(
            GateClass::H,
            "h_a",
            to(Gate::X),
        )]);
        let b = DecompositionRuleSet::from_rules([
            DecompositionRule::new(GateClass::H, "h_b", to(Gate::Z)),
            DecompositionRule::new(GateClass::Swap, "swap_b", to(Gate::Z)),
        ]);
        a.merge(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.rules_for(&GateClass::H)[1].name(), "h_b");
    }
}
