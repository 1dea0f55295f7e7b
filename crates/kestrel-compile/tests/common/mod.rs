//! Shared helpers for integration tests: a dense state-vector simulator
//! used to check that rewrites preserve the implemented unitary.

#![allow(dead_code)]

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use kestrel_compile::engines::{CommandRecorder, ReceivedCommands};
use kestrel_compile::{Engine, MainEngine};
use kestrel_ir::{Command, Gate, QubitId};
use num_complex::Complex64;

type Matrix = [[Complex64; 2]; 2];

const TOLERANCE: f64 = 1e-9;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn phase(angle: f64) -> Complex64 {
    Complex64::from_polar(1.0, angle)
}

fn diagonal(a: Complex64, b: Complex64) -> Matrix {
    [[a, c(0.0, 0.0)], [c(0.0, 0.0), b]]
}

/// The 2x2 matrix of a single-qubit gate, `None` for anything else.
pub fn matrix(gate: &Gate) -> Option<Matrix> {
    let zero = c(0.0, 0.0);
    let one = c(1.0, 0.0);
    let m = match gate {
        Gate::H => {
            let h = c(FRAC_1_SQRT_2, 0.0);
            [[h, h], [h, -h]]
        }
        Gate::X => [[zero, one], [one, zero]],
        Gate::Y => [[zero, c(0.0, -1.0)], [c(0.0, 1.0), zero]],
        Gate::Z => diagonal(one, -one),
        Gate::S => diagonal(one, c(0.0, 1.0)),
        Gate::Sdag => diagonal(one, c(0.0, -1.0)),
        Gate::T => diagonal(one, phase(FRAC_PI_4)),
        Gate::Tdag => diagonal(one, phase(-FRAC_PI_4)),
        Gate::SqrtX => [[c(0.5, 0.5), c(0.5, -0.5)], [c(0.5, -0.5), c(0.5, 0.5)]],
        Gate::SqrtXdag => [[c(0.5, -0.5), c(0.5, 0.5)], [c(0.5, 0.5), c(0.5, -0.5)]],
        Gate::Rx(a) => {
            let (cos, sin) = ((a / 2.0).cos(), (a / 2.0).sin());
            [[c(cos, 0.0), c(0.0, -sin)], [c(0.0, -sin), c(cos, 0.0)]]
        }
        Gate::Ry(a) => {
            let (cos, sin) = ((a / 2.0).cos(), (a / 2.0).sin());
            [[c(cos, 0.0), c(-sin, 0.0)], [c(sin, 0.0), c(cos, 0.0)]]
        }
        Gate::Rz(a) => diagonal(phase(-a / 2.0), phase(a / 2.0)),
        Gate::R(a) => diagonal(one, phase(*a)),
        Gate::Ph(a) => diagonal(phase(*a), phase(*a)),
        Gate::Barrier => diagonal(one, one),
        _ => return None,
    };
    Some(m)
}

/// A dense state vector over `num_qubits` qubits; qubit `k` is bit `k` of
/// the basis index.
#[derive(Debug, Clone)]
pub struct StateVector {
    amplitudes: Vec<Complex64>,
}

impl StateVector {
    /// The basis state `index`.
    pub fn basis(num_qubits: usize, index: usize) -> Self {
        let mut amplitudes = vec![c(0.0, 0.0); 1 << num_qubits];
        amplitudes[index] = c(1.0, 0.0);
        Self { amplitudes }
    }

    fn fires(index: usize, cmd: &Command) -> bool {
        cmd.controls()
            .iter()
            .zip(cmd.control_state().bits())
            .all(|(q, &bit)| ((index >> q.0) & 1 == 1) == bit)
    }

    fn apply_matrix(&mut self, m: &Matrix, target: QubitId, cmd: &Command) {
        let t = 1usize << target.0;
        for i in 0..self.amplitudes.len() {
            if i & t != 0 || !Self::fires(i, cmd) {
                continue;
            }
            let j = i | t;
            let (a0, a1) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = m[0][0] * a0 + m[0][1] * a1;
            self.amplitudes[j] = m[1][0] * a0 + m[1][1] * a1;
        }
    }

    fn apply_swap(&mut self, a: QubitId, b: QubitId, cmd: &Command) {
        let (ba, bb) = (1usize << a.0, 1usize << b.0);
        for i in 0..self.amplitudes.len() {
            if i & ba != 0 && i & bb == 0 && Self::fires(i, cmd) {
                self.amplitudes.swap(i, i ^ ba ^ bb);
            }
        }
    }

    /// Apply one command. Classical instructions are ignored.
    pub fn apply(&mut self, cmd: &Command) {
        let targets: Vec<QubitId> = cmd.qubits().iter().flatten().copied().collect();
        match cmd.gate() {
            gate if gate.is_classical_instruction() => {}
            Gate::Swap => {
                let &[a, b] = targets.as_slice() else {
                    panic!("swap on {} qubits", targets.len());
                };
                self.apply_swap(a, b, cmd);
            }
            Gate::Entangle => {
                let (&first, rest) = targets.split_first().expect("entangle without qubits");
                let h = matrix(&Gate::H).unwrap();
                self.apply_matrix(&h, first, cmd);
                let x = matrix(&Gate::X).unwrap();
                for &q in rest {
                    let cnot = Command::cnot(first, q)
                        .with_control_state(cmd.controls(), cmd.control_state().clone())
                        .unwrap();
                    self.apply_matrix(&x, q, &cnot);
                }
            }
            gate => {
                let m = matrix(gate).unwrap_or_else(|| panic!("cannot simulate {gate:?}"));
                for target in targets {
                    self.apply_matrix(&m, target, cmd);
                }
            }
        }
    }
}

/// Columns of the unitary implemented by `commands`.
pub fn unitary(commands: &[Command], num_qubits: usize) -> Vec<Vec<Complex64>> {
    (0..1 << num_qubits)
        .map(|index| {
            let mut state = StateVector::basis(num_qubits, index);
            for cmd in commands {
                state.apply(cmd);
            }
            state.amplitudes
        })
        .collect()
}

/// Number of qubits needed to simulate `commands`.
pub fn width(commands: &[Command]) -> usize {
    commands
        .iter()
        .flat_map(|cmd| cmd.all_qubits())
        .map(|q| q.0 as usize + 1)
        .max()
        .unwrap_or(0)
}

/// Whether two command sequences implement the same unitary up to a global
/// phase.
pub fn equivalent(a: &[Command], b: &[Command]) -> bool {
    let n = width(a).max(width(b));
    let (ua, ub) = (unitary(a, n), unitary(b, n));
    let flat_a: Vec<Complex64> = ua.into_iter().flatten().collect();
    let flat_b: Vec<Complex64> = ub.into_iter().flatten().collect();
    let Some(k) = flat_a.iter().position(|z| z.norm() > 1e-6) else {
        return false;
    };
    let global = flat_b[k] / flat_a[k];
    (global.norm() - 1.0).abs() < TOLERANCE
        && flat_a
            .iter()
            .zip(&flat_b)
            .all(|(x, y)| (global * x - y).norm() < TOLERANCE)
}

/// Commands that act on the state.
pub fn quantum(commands: &[Command]) -> Vec<Command> {
    commands
        .iter()
        .filter(|c| !c.gate().is_classical_instruction())
        .cloned()
        .collect()
}

/// A driver running `engines` in front of a recording backend.
pub fn recording(engines: Vec<Box<dyn Engine>>) -> (MainEngine, ReceivedCommands) {
    let backend = CommandRecorder::new();
    let received = backend.received();
    let eng = MainEngine::builder()
        .with_engines(engines)
        .with_backend(backend)
        .build()
        .expect("valid pipeline");
    (eng, received)
}
