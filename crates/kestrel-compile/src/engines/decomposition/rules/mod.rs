//! Default decomposition rule library.
//!
//! Rules rewrite one command into an equivalent sequence. Gates that only
//! conjugate the core of a rewrite carry [`Tag::Compute`] and
//! [`Tag::Uncompute`] so later stages can strip or recognize them.
//!
//! The library lowers every built-in gate, with any number of controls, to
//! `{Rz, CNOT}` plus the gates a rule passes through (`H`, `T`, `Tdag`,
//! `Rx`, `Ry`), so a target that accepts `{Rz, H, CNOT}` or
//! `{Rx, Ry, Rz, CZ}` can run any circuit built from built-in gates.

mod barrier;
mod cnot;
mod control_state;
mod entangle;
mod hadamard;
mod multi_control;
mod pauli;
mod phase;
mod rotation;
mod swap;
mod toffoli;

use kestrel_ir::{Command, Gate, QubitId, Tag};

use super::rule::{DecompositionRule, DecompositionRuleSet};
use crate::error::{CompileError, CompileResult};

pub use barrier::barrier_rules;
pub use cnot::cnot_rules;
pub use control_state::control_state_rules;
pub use entangle::entangle_rules;
pub use hadamard::hadamard_rules;
pub use multi_control::multi_control_rules;
pub use pauli::pauli_rules;
pub use phase::phase_rules;
pub use rotation::rotation_rules;
pub use swap::swap_rules;
pub use toffoli::toffoli_rules;

/// Every default rule, in registration order.
pub fn default_rules() -> Vec<DecompositionRule> {
    [
        control_state_rules(),
        swap_rules(),
        cnot_rules(),
        toffoli_rules(),
        phase_rules(),
        rotation_rules(),
        hadamard_rules(),
        pauli_rules(),
        entangle_rules(),
        barrier_rules(),
        multi_control_rules(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// A rule set holding [`default_rules`].
pub fn default_rule_set() -> DecompositionRuleSet {
    DecompositionRuleSet::from_rules(default_rules())
}

fn unexpected_shape(cmd: &Command) -> CompileError {
    CompileError::NoGateDecomposition {
        command: cmd.to_string(),
    }
}

/// The single target of a one-qubit command.
fn single_target(cmd: &Command) -> CompileResult<QubitId> {
    match cmd.qubits() {
        [group] if group.len() == 1 => Ok(group[0]),
        _ => Err(unexpected_shape(cmd)),
    }
}

/// `gate` on `target`, keeping the controls and pattern of `cmd`.
fn keep_controls(cmd: &Command, gate: Gate, target: QubitId) -> CompileResult<Command> {
    Ok(Command::single(gate, target)
        .with_control_state(cmd.controls(), cmd.control_state().clone())?)
}

fn compute(cmd: Command) -> Command {
    cmd.with_tags([Tag::Compute])
}

fn uncompute(cmd: Command) -> Command {
    cmd.with_tags([Tag::Uncompute])
}

/// `cmd` without its tags and with every control firing on |1>.
fn positive_core(cmd: &Command) -> Command {
    let mut core = cmd.clone().with_positive_controls();
    core.tags_mut().clear();
    core
}
