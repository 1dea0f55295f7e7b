//! Negative control patterns.

use kestrel_ir::{Command, Gate, GateClass};

use super::{compute, positive_core, uncompute};
use crate::engines::decomposition::rule::DecompositionRule;

/// Flip every control that fires on |0> with X gates around the command,
/// which then fires on |1> everywhere.
pub fn control_state_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::Basic, "control_state", |cmd: &Command| {
            let flipped: Vec<_> = cmd
                .controls()
                .iter()
                .zip(cmd.control_state().bits())
                .filter(|(_, fires_on_one)| !**fires_on_one)
                .map(|(id, _)| *id)
                .collect();
            let mut out: Vec<Command> = flipped
                .iter()
                .map(|id| compute(Command::single(Gate::X, *id)))
                .collect();
            out.push(positive_core(cmd));
            out.extend(
                flipped
                    .iter()
                    .map(|id| uncompute(Command::single(Gate::X, *id))),
            );
            Ok(out)
        })
        .with_recognizer(Command::has_negative_controls)
        .for_negative_controls(),
    ]
}
