//! Swap to three CNOTs.

use kestrel_ir::{Command, GateClass};

use super::{compute, uncompute, unexpected_shape};
use crate::engines::decomposition::rule::DecompositionRule;

/// `Swap(a, b)` as `CNOT(a→b) CNOT(b→a) CNOT(a→b)`. Only the middle CNOT
/// picks up the swap's own controls.
pub fn swap_rules() -> Vec<DecompositionRule> {
    vec![DecompositionRule::new(
        GateClass::Swap,
        "swap_to_cnot",
        |cmd: &Command| {
            let (a, b) = match cmd.qubits() {
                [a, b] if a.len() == 1 && b.len() == 1 => (a[0], b[0]),
                _ => return Err(unexpected_shape(cmd)),
            };
            let middle = Command::cnot(b, a)
                .with_control_state(cmd.controls(), cmd.control_state().clone())?;
            Ok(vec![
                compute(Command::cnot(a, b)),
                middle,
                uncompute(Command::cnot(a, b)),
            ])
        },
    )]
}
