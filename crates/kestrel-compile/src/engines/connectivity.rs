//! Direction fixing for devices with directed couplings.

use itertools::Itertools;
use kestrel_ir::{Command, Gate, QubitId, Tag};
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::engine::{Downstream, Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Makes every two-qubit command act along a coupling of the device.
///
/// Runs after a mapper, on physical ids. A CNOT whose reverse is the only
/// coupling is flipped by conjugating both qubits with H. A CZ is symmetric
/// and simply exchanges control and target, as does any other controlled
/// phase gate (`S`, `T`, their adjoints and `R`). A negative control is
/// turned positive with an X on each side before the flip. Other controlled
/// gates must already sit on a coupling. A swap becomes three CNOTs oriented
/// along whichever coupling exists, the middle one flipped.
///
/// An uncontrolled gate on two qubits needs a coupling in either direction.
/// Gates touching more than two qubits are rejected, barriers excepted.
///
/// Every emitted command is prefixed with the tags of the command it
/// replaces.
pub struct ConnectivityEnforcer {
    edges: FxHashSet<(u32, u32)>,
}

impl ConnectivityEnforcer {
    /// Enforcer over directed couplings `(control, target)`.
    pub fn new(edges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    /// Whether `(control, target)` is a coupling.
    pub fn has_edge(&self, control: QubitId, target: QubitId) -> bool {
        match (control.index(), target.index()) {
            (Some(c), Some(t)) => self.edges.contains(&(c, t)),
            _ => false,
        }
    }

    fn is_swap(cmd: &Command) -> bool {
        matches!(cmd.gate(), Gate::Swap) && cmd.control_count() == 0
    }

    fn unsupported(cmd: &Command) -> CompileError {
        CompileError::UnsupportedConnectivity {
            command: cmd.to_string(),
        }
    }

    fn rewrite(&self, cmd: Command) -> CompileResult<Vec<Command>> {
        if Self::is_swap(&cmd) {
            return self.expand_swap(&cmd);
        }
        if cmd.gate().is_classical_instruction() || matches!(cmd.gate(), Gate::Barrier) {
            return Ok(vec![cmd]);
        }
        let (&[control], Some(target), 2) = (cmd.controls(), cmd.target(), cmd.qubit_count())
        else {
            return self.check_uncontrolled(cmd);
        };
        if self.has_edge(control, target) {
            return Ok(vec![cmd]);
        }
        if !self.has_edge(target, control) {
            return Err(Self::unsupported(&cmd));
        }
        let flipped = match cmd.gate() {
            Gate::X => flipped_cnot(control, target),
            gate if is_controlled_phase(gate) => {
                vec![Command::controlled(gate.clone(), &[target], control)?]
            }
            _ => return Err(Self::unsupported(&cmd)),
        };
        let out = if cmd.has_negative_controls() {
            let mut out = vec![Command::single(Gate::X, control)];
            out.extend(flipped);
            out.push(Command::single(Gate::X, control));
            out
        } else {
            flipped
        };
        Ok(with_prefix(cmd.tags(), out))
    }

    /// Commands without a single control and single target: at most one
    /// qubit, or two qubits joined by a coupling either way.
    fn check_uncontrolled(&self, cmd: Command) -> CompileResult<Vec<Command>> {
        let qubits: Vec<QubitId> = cmd.all_qubits().unique().collect();
        match qubits.as_slice() {
            [] | [_] => Ok(vec![cmd]),
            &[a, b] if self.has_edge(a, b) || self.has_edge(b, a) => Ok(vec![cmd]),
            _ => Err(Self::unsupported(&cmd)),
        }
    }

    fn expand_swap(&self, cmd: &Command) -> CompileResult<Vec<Command>> {
        let (a, b) = match cmd.qubits() {
            [first, second] if first.len() == 1 && second.len() == 1 => (first[0], second[0]),
            _ => {
                return Err(CompileError::Unroutable {
                    command: cmd.to_string(),
                    reason: "swap acts on exactly two qubits".into(),
                });
            }
        };
        let (control, target) = if self.has_edge(a, b) {
            (a, b)
        } else if self.has_edge(b, a) {
            (b, a)
        } else {
            return Err(Self::unsupported(cmd));
        };
        let mut out = vec![Command::cnot(control, target)];
        out.extend(flipped_cnot(target, control));
        out.push(Command::cnot(control, target));
        Ok(with_prefix(cmd.tags(), out))
    }
}

/// CNOT from `control` to `target` built on the reverse coupling.
fn flipped_cnot(control: QubitId, target: QubitId) -> Vec<Command> {
    vec![
        Command::single(Gate::H, control),
        Command::single(Gate::H, target),
        Command::cnot(target, control),
        Command::single(Gate::H, control),
        Command::single(Gate::H, target),
    ]
}

/// Diagonal gates whose controlled form is symmetric in its two qubits.
fn is_controlled_phase(gate: &Gate) -> bool {
    matches!(
        gate,
        Gate::Z | Gate::S | Gate::Sdag | Gate::T | Gate::Tdag | Gate::R(_)
    )
}

fn with_prefix(tags: &[Tag], commands: Vec<Command>) -> Vec<Command> {
    commands
        .into_iter()
        .map(|mut cmd| {
            let own = std::mem::take(cmd.tags_mut());
            cmd.with_tags(tags.iter().cloned().chain(own))
        })
        .collect()
}

impl Engine for ConnectivityEnforcer {
    fn name(&self) -> &str {
        "connectivity_enforcer"
    }

    fn is_available(&self, cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
        Ok(Self::is_swap(cmd) || next.is_available(cmd)?)
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            let rewritten = self.rewrite(cmd)?;
            trace!(commands = rewritten.len(), "enforced connectivity");
            next.send(rewritten)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{CommandRecorder, ReceivedCommands};
    use kestrel_ir::ControlState;
    use crate::main_engine::MainEngine;

    fn q(id: i64) -> QubitId {
        QubitId(id)
    }

    fn run(edges: &[(u32, u32)], commands: Vec<Command>) -> CompileResult<ReceivedCommands> {
        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::builder()
            .with_engine(ConnectivityEnforcer::new(edges.iter().copied()))
            .with_backend(backend)
            .build()?;
        eng.send(commands)?;
        Ok(received)
    }

    #[test]
    fn test_native_cnot_unchanged() {
        let received = run(&[(0, 1)], vec![Command::cnot(q(0), q(1))]).unwrap();
        assert_eq!(received.snapshot(), vec![Command::cnot(q(0), q(1))]);
    }

    #[test]
    fn test_reversed_cnot_flipped() {
        let received = run(&[(0, 1)], vec![Command::cnot(q(1), q(0))]).unwrap();
        let out = received.snapshot();
        assert_eq!(out.len(), 5);
        let hadamards = out.iter().filter(|c| c.gate() == &Gate::H).count();
        assert_eq!(hadamards, 4);
        let cnots: Vec<_> = out.iter().filter(|c| c.control_count() == 1).collect();
        assert_eq!(cnots, vec![&Command::cnot(q(0), q(1))]);
    }

    #[test]
    fn test_cz_exchanges_roles() {
        let received = run(&[(0, 1)], vec![Command::cz(q(1), q(0))]).unwrap();
        assert_eq!(received.snapshot(), vec![Command::cz(q(0), q(1))]);
    }

    #[test]
    fn test_missing_edge_fails() {
        assert!(matches!(
            run(&[(0, 1)], vec![Command::cnot(q(0), q(2))]),
            Err(CompileError::UnsupportedConnectivity { .. })
        ));
        let crz = Command::controlled(Gate::rz(0.3), &[q(1)], q(0)).unwrap();
        assert!(matches!(
            run(&[(0, 1)], vec![crz]),
            Err(CompileError::UnsupportedConnectivity { .. })
        ));
    }

    #[test]
    fn test_swap_becomes_three_cnots() {
        let received = run(&[(1, 0)], vec![Command::pair(Gate::Swap, q(0), q(1))]).unwrap();
        let out = received.snapshot();
        assert_eq!(out.len(), 7);
        assert!(
            out.iter()
                .filter(|c| c.control_count() == 1)
                .all(|c| c == &Command::cnot(q(1), q(0)))
        );
    }

    #[test]
    fn test_tags_prefixed() {
        let cmd = Command::cnot(q(1), q(0)).with_tags([Tag::Dirty]);
        let received = run(&[(0, 1)], vec![cmd]).unwrap();
        assert!(received.commands().iter().all(|c| c.tags() == [Tag::Dirty]));
    }

    #[test]
    fn test_swap_always_available() {
        let eng = MainEngine::builder()
            .with_engine(ConnectivityEnforcer::new([(0, 1)]))
            .with_backend(CommandRecorder::accepting(|cmd| !matches!(cmd.gate(), Gate::Swap)))
            .build()
            .unwrap();
        assert!(eng.is_available(&Command::pair(Gate::Swap, q(0), q(1))).unwrap());
    }

    #[test]
    fn test_negative_control_flip() {
        let cmd = Command::single(Gate::X, q(0))
            .with_control_state(&[q(1)], ControlState::from_bits(vec![false]))
            .unwrap();
        let received = run(&[(0, 1)], vec![cmd]).unwrap();
        let out = received.snapshot();
        assert_eq!(out.len(), 7);
        assert_eq!(out[0], Command::single(Gate::X, q(1)));
        assert_eq!(out[6], Command::single(Gate::X, q(1)));
        assert_eq!(&out[1..6], flipped_cnot(q(1), q(0)).as_slice());
        assert!(out.iter().all(|c| !c.has_negative_controls()));
    }

    #[test]
    fn test_negative_control_cz_exchanges_roles() {
        let cmd = Command::single(Gate::Z, q(0))
            .with_control_state(&[q(1)], ControlState::from_bits(vec![false]))
            .unwrap();
        let received = run(&[(0, 1)], vec![cmd]).unwrap();
        assert_eq!(
            received.snapshot(),
            vec![
                Command::single(Gate::X, q(1)),
                Command::cz(q(0), q(1)),
                Command::single(Gate::X, q(1)),
            ]
        );
    }

    #[test]
    fn test_controlled_phase_exchanges_roles() {
        for gate in [Gate::r(0.7), Gate::T, Gate::Sdag] {
            let cmd = Command::controlled(gate.clone(), &[q(1)], q(0)).unwrap();
            let received = run(&[(0, 1)], vec![cmd]).unwrap();
            assert_eq!(
                received.snapshot(),
                vec![Command::controlled(gate, &[q(0)], q(1)).unwrap()]
            );
        }
    }

    #[test]
    fn test_uncontrolled_two_qubit_gate_needs_edge() {
        let entangle = |a: i64, b: i64| Command::new(Gate::Entangle, vec![vec![q(a), q(b)]]);
        let received = run(&[(0, 1)], vec![entangle(0, 1), entangle(1, 0)]).unwrap();
        assert_eq!(received.snapshot(), vec![entangle(0, 1), entangle(1, 0)]);
        assert!(matches!(
            run(&[(0, 1)], vec![entangle(0, 3)]),
            Err(CompileError::UnsupportedConnectivity { .. })
        ));
    }

    #[test]
    fn test_wide_gates_rejected() {
        let entangle = Command::new(Gate::Entangle, vec![vec![q(0), q(1), q(2)]]);
        let toffoli = Command::controlled(Gate::X, &[q(0), q(1)], q(2)).unwrap();
        let edges = [(0, 1), (1, 2), (0, 2)];
        for cmd in [entangle, toffoli] {
            assert!(matches!(
                run(&edges, vec![cmd]),
                Err(CompileError::UnsupportedConnectivity { .. })
            ));
        }
        let barrier = Command::new(Gate::Barrier, vec![vec![q(0), q(3), q(4)]]);
        assert_eq!(run(&edges, vec![barrier.clone()]).unwrap().snapshot(), vec![barrier]);
    }

    #[test]
    fn test_single_qubit_and_flush_pass_through() {
        let cmds = vec![Command::single(Gate::T, q(4)), Command::flush()];
        let received = run(&[(0, 1)], cmds.clone()).unwrap();
        assert_eq!(received.snapshot(), cmds);
    }
}
