//! Axis rotations.

use std::f64::consts::FRAC_PI_2;

use kestrel_ir::{Command, Gate, GateClass};

use super::{compute, keep_controls, single_target, uncompute};
use crate::engines::decomposition::rule::DecompositionRule;
use crate::error::CompileResult;

fn uncontrolled(cmd: &Command) -> bool {
    cmd.control_count() == 0
}

/// `basis · core · basis⁻¹` with `core` keeping the controls of `cmd`.
fn conjugated(cmd: &Command, basis: Gate, core: Gate) -> CompileResult<Vec<Command>> {
    let target = single_target(cmd)?;
    let undo = basis.inverse()?;
    Ok(vec![
        compute(Command::single(basis, target)),
        keep_controls(cmd, core, target)?,
        uncompute(Command::single(undo, target)),
    ])
}

/// Rotation rules:
///
/// - controlled `Rz(a)` is `Rz(a/2)·CⁿX·Rz(-a/2)·CⁿX`;
/// - uncontrolled `Rz(a)` is `Rx(∓a)` conjugated by `Ry(∓π/2)` (two variants);
/// - `Rx(a)` is `Rz(a)` conjugated by `H`;
/// - `Ry(a)` is `Rz(a)` conjugated by `Rx(π/2)`.
pub fn rotation_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::Rz, "crz_to_cnot_and_rz", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            let target = single_target(cmd)?;
            Ok(vec![
                Command::single(Gate::rz(angle / 2.0), target),
                keep_controls(cmd, Gate::X, target)?,
                Command::single(Gate::rz(-angle / 2.0), target),
                keep_controls(cmd, Gate::X, target)?,
            ])
        })
        .with_recognizer(|cmd: &Command| cmd.control_count() >= 1),
        DecompositionRule::new(GateClass::Rz, "rz_to_rx_plus", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            conjugated(cmd, Gate::ry(-FRAC_PI_2), Gate::rx(-angle))
        })
        .with_recognizer(uncontrolled),
        DecompositionRule::new(GateClass::Rz, "rz_to_rx_minus", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            conjugated(cmd, Gate::ry(FRAC_PI_2), Gate::rx(angle))
        })
        .with_recognizer(uncontrolled),
        DecompositionRule::new(GateClass::Rx, "rx_to_rz", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            conjugated(cmd, Gate::H, Gate::rz(angle))
        }),
        DecompositionRule::new(GateClass::Ry, "ry_to_rz", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            conjugated(cmd, Gate::rx(FRAC_PI_2), Gate::rz(angle))
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::DecompositionRuleSet;
    use kestrel_ir::{QubitId, Tag};

    #[test]
    fn test_uncontrolled_rz_has_two_variants() {
        let set = DecompositionRuleSet::from_rules(rotation_rules());
        let cmd = Command::single(Gate::rz(0.3), QubitId(0));
        let names: Vec<&str> = set.candidates(&cmd).iter().map(|r| r.name()).collect();
        assert_eq!(names, ["rz_to_rx_plus", "rz_to_rx_minus"]);
    }

    #[test]
    fn test_controlled_rz() {
        let set = DecompositionRuleSet::from_rules(rotation_rules());
        let cmd = Command::controlled(Gate::rz(0.3), &[QubitId(0)], QubitId(1)).unwrap();
        let candidates = set.candidates(&cmd);
        assert_eq!(candidates.len(), 1);
        let out = candidates[0].rewrite(&cmd).unwrap();
        assert_eq!(out[0].gate(), &Gate::rz(0.15));
        assert_eq!(out[1], Command::cnot(QubitId(0), QubitId(1)));
        assert_eq!(out[2].gate(), &Gate::rz(-0.15));
    }

    #[test]
    fn test_rx_conjugated_by_hadamard() {
        let cmd = Command::controlled(Gate::rx(0.3), &[QubitId(0)], QubitId(1)).unwrap();
        let out = rotation_rules()[3].rewrite(&cmd).unwrap();
        assert_eq!(out[0], Command::single(Gate::H, QubitId(1)).with_tags([Tag::Compute]));
        assert_eq!(out[1].controls(), &[QubitId(0)]);
        assert_eq!(out[2].tags(), &[Tag::Uncompute]);
        assert_eq!(out[2].control_count(), 0);
    }
}
