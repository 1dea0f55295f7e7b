//! Hadamard in terms of rotations.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use kestrel_ir::{Command, Gate, GateClass};

use super::{compute, keep_controls, single_target, uncompute};
use crate::engines::decomposition::rule::DecompositionRule;

fn uncontrolled(cmd: &Command) -> bool {
    cmd.control_count() == 0
}

/// Two uncontrolled variants: `Ry(π/2)·Ph(3π/2)·Rx(-π)` and
/// `Rx(π)·Ph(π/2)·Ry(-π/2)`, in application order. With controls, H is a
/// Z conjugated by `Ry(π/4)` on the target.
pub fn hadamard_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::H, "h_to_ry_first", |cmd: &Command| {
            let q = single_target(cmd)?;
            Ok(vec![
                Command::single(Gate::ry(FRAC_PI_2), q),
                Command::single(Gate::ph(3.0 * FRAC_PI_2), q),
                Command::single(Gate::rx(-PI), q),
            ])
        })
        .with_recognizer(uncontrolled),
        DecompositionRule::new(GateClass::H, "h_to_rx_first", |cmd: &Command| {
            let q = single_target(cmd)?;
            Ok(vec![
                Command::single(Gate::rx(PI), q),
                Command::single(Gate::ph(FRAC_PI_2), q),
                Command::single(Gate::ry(-FRAC_PI_2), q),
            ])
        })
        .with_recognizer(uncontrolled),
        DecompositionRule::new(GateClass::H, "ch_to_cz", |cmd: &Command| {
            let q = single_target(cmd)?;
            Ok(vec![
                compute(Command::single(Gate::ry(-FRAC_PI_4), q)),
                keep_controls(cmd, Gate::Z, q)?,
                uncompute(Command::single(Gate::ry(FRAC_PI_4), q)),
            ])
        })
        .with_recognizer(|cmd: &Command| !uncontrolled(cmd)),
    ]
}
