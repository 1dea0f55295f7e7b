//! X and Y as rotations.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use kestrel_ir::{Command, Gate, GateClass};

use super::{keep_controls, single_target};
use crate::engines::decomposition::rule::DecompositionRule;

/// `X = Ph(π/2)·Rx(π)` without controls, `Y = Ph(π/2)·Ry(π)` and
/// `SqrtX = Ph(π/4)·Rx(π/2)` with any.
pub fn pauli_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::X, "x_to_rx", |cmd: &Command| {
            let q = single_target(cmd)?;
            Ok(vec![
                Command::single(Gate::rx(PI), q),
                Command::single(Gate::ph(FRAC_PI_2), q),
            ])
        })
        .with_recognizer(|cmd: &Command| cmd.control_count() == 0),
        DecompositionRule::new(GateClass::Y, "y_to_ry", |cmd: &Command| {
            let q = single_target(cmd)?;
            Ok(vec![
                keep_controls(cmd, Gate::ry(PI), q)?,
                keep_controls(cmd, Gate::ph(FRAC_PI_2), q)?,
            ])
        }),
        sqrt_x(GateClass::SqrtX, "sqrtx_to_rx", 1.0),
        sqrt_x(GateClass::SqrtXdag, "sqrtxdag_to_rx", -1.0),
    ]
}

fn sqrt_x(class: GateClass, name: &'static str, sign: f64) -> DecompositionRule {
    DecompositionRule::new(class, name, move |cmd: &Command| {
        let q = single_target(cmd)?;
        Ok(vec![
            keep_controls(cmd, Gate::rx(sign * FRAC_PI_2), q)?,
            keep_controls(cmd, Gate::ph(sign * FRAC_PI_4), q)?,
        ])
    })
}
