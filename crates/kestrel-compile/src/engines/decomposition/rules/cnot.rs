//! CNOT and CZ in terms of each other.

use kestrel_ir::{Command, Gate, GateClass};

use super::{compute, single_target, uncompute};
use crate::engines::decomposition::rule::DecompositionRule;
use crate::error::CompileResult;

fn single_control(cmd: &Command) -> bool {
    cmd.control_count() == 1
}

/// Hadamard conjugation of the target: `CNOT = H·CZ·H` and `CZ = H·CNOT·H`.
fn conjugate(cmd: &Command, core: Gate) -> CompileResult<Vec<Command>> {
    let target = single_target(cmd)?;
    let mut middle = cmd.clone().with_gate(core);
    middle.tags_mut().clear();
    Ok(vec![
        compute(Command::single(Gate::H, target)),
        middle,
        uncompute(Command::single(Gate::H, target)),
    ])
}

/// `cnot_to_cz` and `cz_to_cnot`, both for exactly one control.
pub fn cnot_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::X, "cnot_to_cz", |cmd: &Command| {
            conjugate(cmd, Gate::Z)
        })
        .with_recognizer(single_control),
        DecompositionRule::new(GateClass::Z, "cz_to_cnot", |cmd: &Command| {
            conjugate(cmd, Gate::X)
        })
        .with_recognizer(single_control),
    ]
}
