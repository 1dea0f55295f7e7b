//! Barriers.

use kestrel_ir::{Command, GateClass};

use crate::engines::decomposition::rule::DecompositionRule;

/// A barrier has no effect on the state and is dropped.
pub fn barrier_rules() -> Vec<DecompositionRule> {
    vec![DecompositionRule::new(
        GateClass::Barrier,
        "drop_barrier",
        |_: &Command| Ok(vec![]),
    )]
}
