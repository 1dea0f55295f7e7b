//! Toffoli to CNOT and T gates.

use kestrel_ir::{Command, Gate, GateClass, QubitId};

use super::{single_target, unexpected_shape};
use crate::engines::decomposition::rule::DecompositionRule;

/// The doubly controlled X as fifteen gates: two H, six CNOT and seven
/// T/Tdag. Both controls must fire on |1>.
pub fn toffoli_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::X, "toffoli_to_cnot_and_t", |cmd: &Command| {
            let target = single_target(cmd)?;
            let &[c0, c1] = cmd.controls() else {
                return Err(unexpected_shape(cmd));
            };
            let on = |gate: Gate, qubit: QubitId| Command::single(gate, qubit);
            Ok(vec![
                on(Gate::H, target),
                Command::cnot(c0, target),
                on(Gate::T, c0),
                on(Gate::Tdag, target),
                Command::cnot(c1, target),
                Command::cnot(c1, c0),
                on(Gate::Tdag, c0),
                on(Gate::T, target),
                Command::cnot(c1, c0),
                Command::cnot(c0, target),
                on(Gate::Tdag, target),
                Command::cnot(c1, target),
                on(Gate::T, target),
                on(Gate::T, c1),
                on(Gate::H, target),
            ])
        })
        .with_recognizer(|cmd: &Command| {
            cmd.control_count() == 2 && !cmd.has_negative_controls()
        }),
    ]
}
