//! GHZ preparation.

use kestrel_ir::{Command, Gate, GateClass, QubitId};

use super::{keep_controls, unexpected_shape};
use crate::engines::decomposition::rule::DecompositionRule;

/// `Entangle` on `q0..qn` as `H(q0)` followed by `X(qi)` controlled on
/// `q0` for every other qubit. Outer controls apply to every gate.
pub fn entangle_rules() -> Vec<DecompositionRule> {
    vec![DecompositionRule::new(
        GateClass::Entangle,
        "entangle_to_h_and_cnot",
        |cmd: &Command| {
            let qubits: Vec<QubitId> = cmd.qubits().iter().flatten().copied().collect();
            let (&first, rest) = qubits.split_first().ok_or_else(|| unexpected_shape(cmd))?;
            let mut out = vec![keep_controls(cmd, Gate::H, first)?];
            for &q in rest {
                out.push(
                    Command::cnot(first, q)
                        .with_control_state(cmd.controls(), cmd.control_state().clone())?,
                );
            }
            Ok(out)
        },
    )]
}
