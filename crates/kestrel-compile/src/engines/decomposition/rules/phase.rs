//! Global phases and phase shifts.

use std::f64::consts::PI;

use kestrel_ir::{Command, ControlState, Gate, GateClass};

use super::{compute, keep_controls, single_target, uncompute, unexpected_shape};
use crate::engines::decomposition::rule::DecompositionRule;

fn has_controls(cmd: &Command) -> bool {
    cmd.control_count() > 0
}

/// Rewrites a fixed phase gate as `R(angle)`, keeping controls.
fn to_phase_shift(class: GateClass, name: &'static str, angle: f64) -> DecompositionRule {
    DecompositionRule::new(class, name, move |cmd: &Command| {
        let target = single_target(cmd)?;
        Ok(vec![keep_controls(cmd, Gate::r(angle), target)?])
    })
}

/// Phase rules:
///
/// - a controlled global phase is a phase shift on the first control,
///   controlled by the others;
/// - an uncontrolled global phase is dropped;
/// - `R(a)` is `Ph(a/2)·Rz(a)`;
/// - `Z`, `S`, `Sdag`, `T` and `Tdag` are phase shifts.
pub fn phase_rules() -> Vec<DecompositionRule> {
    vec![
        DecompositionRule::new(GateClass::Ph, "ph_to_r", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            let (first, rest) = cmd
                .controls()
                .split_first()
                .ok_or_else(|| unexpected_shape(cmd))?;
            let pattern = cmd.control_state().bits();
            let shift = Command::single(Gate::r(angle), *first)
                .with_control_state(rest, ControlState::from_bits(pattern[1..].to_vec()))?;
            // A control firing on |0> picks up the phase on |0>.
            if !pattern[0] {
                return Ok(vec![
                    compute(Command::single(Gate::X, *first)),
                    shift,
                    uncompute(Command::single(Gate::X, *first)),
                ]);
            }
            Ok(vec![shift])
        })
        .with_recognizer(has_controls),
        DecompositionRule::new(GateClass::Ph, "drop_global_phase", |_: &Command| Ok(vec![]))
            .with_recognizer(|cmd: &Command| !has_controls(cmd)),
        DecompositionRule::new(GateClass::R, "r_to_rz_and_ph", |cmd: &Command| {
            let angle = cmd.gate().angle().unwrap_or_default();
            let target = single_target(cmd)?;
            Ok(vec![
                keep_controls(cmd, Gate::ph(angle / 2.0), target)?,
                keep_controls(cmd, Gate::rz(angle), target)?,
            ])
        }),
        to_phase_shift(GateClass::Z, "z_to_r", PI),
        to_phase_shift(GateClass::S, "s_to_r", PI / 2.0),
        to_phase_shift(GateClass::Sdag, "sdag_to_r", -PI / 2.0),
        to_phase_shift(GateClass::T, "t_to_r", PI / 4.0),
        to_phase_shift(GateClass::Tdag, "tdag_to_r", -PI / 4.0),
    ]
}
