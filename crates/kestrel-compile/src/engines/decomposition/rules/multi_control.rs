//! Gates with many controls, one control at a time.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8};

use kestrel_ir::{Command, Gate, GateClass, QubitId};

use super::{single_target, unexpected_shape};
use crate::engines::decomposition::rule::DecompositionRule;
use crate::error::CompileResult;

/// A square root of `gate` as a sequence in application order, for the
/// gates that have one in the built-in set.
fn square_root(gate: &Gate) -> Option<Vec<Gate>> {
    let root = match gate {
        Gate::X => vec![Gate::rx(FRAC_PI_2), Gate::ph(FRAC_PI_4)],
        Gate::Y => vec![Gate::ry(FRAC_PI_2), Gate::ph(FRAC_PI_4)],
        Gate::Z => vec![Gate::r(FRAC_PI_2)],
        Gate::S => vec![Gate::r(FRAC_PI_4)],
        Gate::Sdag => vec![Gate::r(-FRAC_PI_4)],
        Gate::T => vec![Gate::r(FRAC_PI_8)],
        Gate::Tdag => vec![Gate::r(-FRAC_PI_8)],
        Gate::SqrtX => vec![Gate::rx(FRAC_PI_4), Gate::ph(FRAC_PI_8)],
        Gate::SqrtXdag => vec![Gate::rx(-FRAC_PI_4), Gate::ph(-FRAC_PI_8)],
        // H is a half turn about (x+z)/√2 times a phase of i.
        Gate::H => vec![
            Gate::ry(-FRAC_PI_4),
            Gate::rz(FRAC_PI_2),
            Gate::ry(FRAC_PI_4),
            Gate::ph(FRAC_PI_4),
        ],
        Gate::Rx(a) => vec![Gate::rx(a / 2.0)],
        Gate::Ry(a) => vec![Gate::ry(a / 2.0)],
        Gate::Rz(a) => vec![Gate::rz(a / 2.0)],
        Gate::R(a) => vec![Gate::r(a / 2.0)],
        Gate::Ph(a) => vec![Gate::ph(a / 2.0)],
        _ => return None,
    };
    Some(root)
}

/// Positive controls only, a single target and more controls than the
/// Toffoli rule takes for X.
fn recognize(cmd: &Command) -> bool {
    let needed = if cmd.gate() == &Gate::X { 3 } else { 2 };
    cmd.control_count() >= needed
        && !cmd.has_negative_controls()
        && matches!(cmd.qubits(), [group] if group.len() == 1)
        && square_root(cmd.gate()).is_some()
}

/// `gates` on `target`, each controlled by `controls`.
fn controlled(gates: &[Gate], controls: &[QubitId], target: QubitId) -> CompileResult<Vec<Command>> {
    gates
        .iter()
        .map(|gate| -> CompileResult<Command> {
            Ok(Command::controlled(gate.clone(), controls, target)?)
        })
        .collect()
}

/// A gate `U` with controls `c1..cn` becomes, with `V·V = U`:
///
/// ```text
/// V on cn, X on cn controlled by c1..c(n-1), V† on cn,
/// X on cn controlled by c1..c(n-1), V controlled by c1..c(n-1)
/// ```
///
/// Every emitted command has fewer controls than the original, so repeated
/// application ends at the single- and double-control rules. Registered on
/// [`GateClass::Basic`], it only fires when no rule of the gate's own class
/// recognizes the command.
pub fn multi_control_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::Basic, "multi_controlled_to_roots", |cmd: &Command| {
            let target = single_target(cmd)?;
            let root = square_root(cmd.gate()).ok_or_else(|| unexpected_shape(cmd))?;
            let root_inverse = root
                .iter()
                .rev()
                .map(Gate::inverse)
                .collect::<Result<Vec<_>, _>>()?;
            let (&last, rest) = cmd
                .controls()
                .split_last()
                .ok_or_else(|| unexpected_shape(cmd))?;
            let flip = Command::controlled(Gate::X, rest, last)?;

            let mut out = controlled(&root, &[last], target)?;
            out.push(flip.clone());
            out.extend(controlled(&root_inverse, &[last], target)?);
            out.push(flip);
            out.extend(controlled(&root, rest, target)?);
            Ok(out)
        })
        .with_recognizer(recognize),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ir::ControlState;

    fn q(id: i64) -> QubitId {
        QubitId(id)
    }

    #[test]
    fn test_recognizer_bounds() {
        let x = |controls: &[QubitId]| Command::controlled(Gate::X, controls, q(9)).unwrap();
        let rule = &multi_control_rules()[0];
        assert!(!rule.recognizes(&x(&[q(0), q(1)])));
        assert!(rule.recognizes(&x(&[q(0), q(1), q(2)])));
        let rz = Command::controlled(Gate::rz(0.3), &[q(0), q(1)], q(9)).unwrap();
        assert!(rule.recognizes(&rz));

        let negative = Command::single(Gate::X, q(9))
            .with_control_state(
                &[q(0), q(1), q(2)],
                ControlState::from_bits(vec![true, false, true]),
            )
            .unwrap();
        assert!(!rule.recognizes(&negative));
        let swap = Command::pair(Gate::Swap, q(3), q(4))
            .with_controls(&[q(0), q(1)])
            .unwrap();
        assert!(!rule.recognizes(&swap));
    }

    #[test]
    fn test_controls_shrink() {
        let cmd = Command::controlled(Gate::X, &[q(0), q(1), q(2), q(3)], q(4)).unwrap();
        let out = multi_control_rules()[0].rewrite(&cmd).unwrap();
        assert!(out.iter().all(|c| c.control_count() < 4));
        let flips: Vec<_> = out.iter().filter(|c| c.gate() == &Gate::X).collect();
        assert_eq!(flips.len(), 2);
        assert!(flips.iter().all(|c| c.target() == Some(q(3)) && c.control_count() == 3));
    }

    #[test]
    fn test_roots_square_to_gate() {
        assert_eq!(square_root(&Gate::rz(1.2)), Some(vec![Gate::rz(0.6)]));
        assert_eq!(square_root(&Gate::T), Some(vec![Gate::r(FRAC_PI_8)]));
        assert!(square_root(&Gate::Swap).is_none());
        assert!(square_root(&Gate::Entangle).is_none());
    }
}
