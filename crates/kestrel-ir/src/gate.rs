//! Gate types.
//!
//! [`Gate`] is a closed set of operation kinds with a small capability set:
//! some gates are invertible, rotations and phases are mergeable and carry a
//! single angle, and [`CustomGate`] covers black-box and math gates supplied
//! by the user. Each gate belongs to a [`GateClass`], and classes form a
//! fixed ancestry chain used by decomposition rule lookup.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Tolerance for comparing rotation angles.
pub const ANGLE_TOLERANCE: f64 = 1e-12;

/// Period of `Rx`, `Ry` and `Rz` angles.
pub const ROTATION_PERIOD: f64 = 4.0 * PI;

/// Period of `R` and `Ph` angles.
pub const PHASE_PERIOD: f64 = 2.0 * PI;

/// Reduce an angle into `[0, period)`, snapping values within tolerance of
/// the period to zero.
pub fn normalize_angle(angle: f64, period: f64) -> f64 {
    let reduced = angle.rem_euclid(period);
    if period - reduced < ANGLE_TOLERANCE {
        0.0
    } else {
        reduced
    }
}

/// Compare two angles modulo `period`.
pub fn angles_close(a: f64, b: f64, period: f64) -> bool {
    let diff = (a - b).rem_euclid(period);
    diff < ANGLE_TOLERANCE || period - diff < ANGLE_TOLERANCE
}

/// Function evaluated by a math gate on the integer values of its registers.
pub type MathFunction = Arc<dyn Fn(&[u64]) -> Vec<u64> + Send + Sync>;

/// A user-defined gate.
///
/// Equality is by name and parameters. A custom gate is only invertible when
/// constructed with [`CustomGate::with_inverse`].
#[derive(Clone)]
pub struct CustomGate {
    name: String,
    params: Vec<f64>,
    inverse: Option<Arc<CustomGate>>,
    function: Option<MathFunction>,
}

impl CustomGate {
    /// Create an opaque gate with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: vec![],
            inverse: None,
            function: None,
        }
    }

    /// Create a math gate whose action on basis states is `function`.
    pub fn math(
        name: impl Into<String>,
        function: impl Fn(&[u64]) -> Vec<u64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            function: Some(Arc::new(function)),
            ..Self::new(name)
        }
    }

    /// Set the gate parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<f64>) -> Self {
        self.params = params;
        self
    }

    /// Declare the inverse of this gate.
    #[must_use]
    pub fn with_inverse(mut self, inverse: CustomGate) -> Self {
        self.inverse = Some(Arc::new(inverse));
        self
    }

    /// Gate name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gate parameters.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Whether this gate carries a math function.
    pub fn is_math(&self) -> bool {
        self.function.is_some()
    }

    /// Evaluate the math function, if any.
    pub fn apply(&self, registers: &[u64]) -> Option<Vec<u64>> {
        self.function.as_ref().map(|f| f(registers))
    }
}

impl PartialEq for CustomGate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| (a - b).abs() < ANGLE_TOLERANCE)
    }
}

impl fmt::Debug for CustomGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomGate")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("invertible", &self.inverse.is_some())
            .field("math", &self.is_math())
            .finish()
    }
}

/// A gate kind.
#[derive(Debug, Clone)]
pub enum Gate {
    // Classical instructions
    /// Allocate a fresh qubit.
    Allocate,
    /// Release a qubit.
    Deallocate,
    /// Measure a qubit in the computational basis.
    Measure,
    /// End-of-batch sentinel.
    Flush,

    /// Ordering barrier; has no effect on the state.
    Barrier,

    // Fixed single-qubit gates
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdag,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdag,
    /// sqrt(X) gate.
    SqrtX,
    /// sqrt(X)-dagger gate.
    SqrtXdag,

    // Fixed multi-qubit gates
    /// Exchange of two qubits.
    Swap,
    /// GHZ-state preparation on a register.
    Entangle,

    // Parametrized gates
    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// Phase shift of the |1> state.
    R(f64),
    /// Global phase.
    Ph(f64),

    /// User-defined gate.
    Custom(CustomGate),
}

impl Gate {
    /// Rotation around X, angle reduced modulo 4pi.
    pub fn rx(angle: f64) -> Self {
        Gate::Rx(normalize_angle(angle, ROTATION_PERIOD))
    }

    /// Rotation around Y, angle reduced modulo 4pi.
    pub fn ry(angle: f64) -> Self {
        Gate::Ry(normalize_angle(angle, ROTATION_PERIOD))
    }

    /// Rotation around Z, angle reduced modulo 4pi.
    pub fn rz(angle: f64) -> Self {
        Gate::Rz(normalize_angle(angle, ROTATION_PERIOD))
    }

    /// Phase shift, angle reduced modulo 2pi.
    pub fn r(angle: f64) -> Self {
        Gate::R(normalize_angle(angle, PHASE_PERIOD))
    }

    /// Global phase, angle reduced modulo 2pi.
    pub fn ph(angle: f64) -> Self {
        Gate::Ph(normalize_angle(angle, PHASE_PERIOD))
    }

    /// Get the gate name.
    pub fn name(&self) -> &str {
        match self {
            Gate::Allocate => "Allocate",
            Gate::Deallocate => "Deallocate",
            Gate::Measure => "Measure",
            Gate::Flush => "Flush",
            Gate::Barrier => "Barrier",
            Gate::H => "H",
            Gate::X => "X",
            Gate::Y => "Y",
            Gate::Z => "Z",
            Gate::S => "S",
            Gate::Sdag => "Sdag",
            Gate::T => "T",
            Gate::Tdag => "Tdag",
            Gate::SqrtX => "SqrtX",
            Gate::SqrtXdag => "SqrtXdag",
            Gate::Swap => "Swap",
            Gate::Entangle => "Entangle",
            Gate::Rx(_) => "Rx",
            Gate::Ry(_) => "Ry",
            Gate::Rz(_) => "Rz",
            Gate::R(_) => "R",
            Gate::Ph(_) => "Ph",
            Gate::Custom(custom) => custom.name(),
        }
    }

    /// The class this gate belongs to.
    pub fn class(&self) -> GateClass {
        match self {
            Gate::Allocate => GateClass::Allocate,
            Gate::Deallocate => GateClass::Deallocate,
            Gate::Measure => GateClass::Measure,
            Gate::Flush => GateClass::Flush,
            Gate::Barrier => GateClass::Barrier,
            Gate::H => GateClass::H,
            Gate::X => GateClass::X,
            Gate::Y => GateClass::Y,
            Gate::Z => GateClass::Z,
            Gate::S => GateClass::S,
            Gate::Sdag => GateClass::Sdag,
            Gate::T => GateClass::T,
            Gate::Tdag => GateClass::Tdag,
            Gate::SqrtX => GateClass::SqrtX,
            Gate::SqrtXdag => GateClass::SqrtXdag,
            Gate::Swap => GateClass::Swap,
            Gate::Entangle => GateClass::Entangle,
            Gate::Rx(_) => GateClass::Rx,
            Gate::Ry(_) => GateClass::Ry,
            Gate::Rz(_) => GateClass::Rz,
            Gate::R(_) => GateClass::R,
            Gate::Ph(_) => GateClass::Ph,
            Gate::Custom(custom) => GateClass::Custom(custom.name.clone()),
        }
    }

    /// The class chain of this gate, most specific first, ending in
    /// [`GateClass::Basic`].
    pub fn ancestry(&self) -> Vec<GateClass> {
        self.class().ancestry(self.is_math())
    }

    /// The rotation angle, for parametrized gates.
    pub fn angle(&self) -> Option<f64> {
        match self {
            Gate::Rx(a) | Gate::Ry(a) | Gate::Rz(a) | Gate::R(a) | Gate::Ph(a) => Some(*a),
            _ => None,
        }
    }

    /// The angle period, for parametrized gates.
    pub fn period(&self) -> Option<f64> {
        match self {
            Gate::Rx(_) | Gate::Ry(_) | Gate::Rz(_) => Some(ROTATION_PERIOD),
            Gate::R(_) | Gate::Ph(_) => Some(PHASE_PERIOD),
            _ => None,
        }
    }

    /// Allocate, deallocate, measure and flush. These are always executable
    /// and are never decomposed.
    pub fn is_classical_instruction(&self) -> bool {
        matches!(
            self,
            Gate::Allocate | Gate::Deallocate | Gate::Measure | Gate::Flush
        )
    }

    /// Instructions that force buffered commands on their qubits out.
    pub fn is_fast_forwarding(&self) -> bool {
        matches!(self, Gate::Deallocate | Gate::Measure | Gate::Flush)
    }

    /// Whether the gate is its own inverse.
    pub fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            Gate::H | Gate::X | Gate::Y | Gate::Z | Gate::Swap | Gate::Barrier
        )
    }

    /// Whether the gate has no effect, up to tolerance.
    pub fn is_identity(&self) -> bool {
        match (self.angle(), self.period()) {
            (Some(angle), Some(period)) => angles_close(angle, 0.0, period),
            _ => false,
        }
    }

    /// Whether this is a math gate.
    pub fn is_math(&self) -> bool {
        matches!(self, Gate::Custom(custom) if custom.is_math())
    }

    /// Get the inverse gate.
    pub fn inverse(&self) -> IrResult<Gate> {
        let inverse = match self {
            Gate::H | Gate::X | Gate::Y | Gate::Z | Gate::Swap | Gate::Barrier => self.clone(),
            Gate::S => Gate::Sdag,
            Gate::Sdag => Gate::S,
            Gate::T => Gate::Tdag,
            Gate::Tdag => Gate::T,
            Gate::SqrtX => Gate::SqrtXdag,
            Gate::SqrtXdag => Gate::SqrtX,
            Gate::Rx(a) => Gate::rx(-a),
            Gate::Ry(a) => Gate::ry(-a),
            Gate::Rz(a) => Gate::rz(-a),
            Gate::R(a) => Gate::r(-a),
            Gate::Ph(a) => Gate::ph(-a),
            Gate::Custom(custom) => match &custom.inverse {
                Some(inverse) => Gate::Custom(inverse.as_ref().clone()),
                None => return Err(IrError::NotInvertible(self.to_string())),
            },
            Gate::Allocate
            | Gate::Deallocate
            | Gate::Measure
            | Gate::Flush
            | Gate::Entangle => return Err(IrError::NotInvertible(self.to_string())),
        };
        Ok(inverse)
    }

    /// Merge with a following gate of the same kind.
    pub fn merge(&self, other: &Gate) -> IrResult<Gate> {
        match (self, other) {
            (Gate::Rx(a), Gate::Rx(b)) => Ok(Gate::rx(a + b)),
            (Gate::Ry(a), Gate::Ry(b)) => Ok(Gate::ry(a + b)),
            (Gate::Rz(a), Gate::Rz(b)) => Ok(Gate::rz(a + b)),
            (Gate::R(a), Gate::R(b)) => Ok(Gate::r(a + b)),
            (Gate::Ph(a), Gate::Ph(b)) => Ok(Gate::ph(a + b)),
            _ => Err(IrError::NotMergeable {
                gate: self.to_string(),
                other: other.to_string(),
            }),
        }
    }
}

impl PartialEq for Gate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Gate::Rx(a), Gate::Rx(b))
            | (Gate::Ry(a), Gate::Ry(b))
            | (Gate::Rz(a), Gate::Rz(b)) => angles_close(*a, *b, ROTATION_PERIOD),
            (Gate::R(a), Gate::R(b)) | (Gate::Ph(a), Gate::Ph(b)) => {
                angles_close(*a, *b, PHASE_PERIOD)
            }
            (Gate::Custom(a), Gate::Custom(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Custom(custom) if !custom.params.is_empty() => {
                let params: Vec<String> = custom.params.iter().map(f64::to_string).collect();
                write!(f, "{}({})", custom.name, params.join(", "))
            }
            _ => match self.angle() {
                Some(angle) => write!(f, "{}({})", self.name(), angle),
                None => write!(f, "{}", self.name()),
            },
        }
    }
}

/// Gate classes used to index decomposition rules.
///
/// Concrete classes have a single parent; walking [`GateClass::parent`] from
/// any class ends at [`GateClass::Basic`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateClass {
    /// Root of every chain.
    Basic,
    /// Allocate, deallocate, measure and flush.
    ClassicalInstruction,
    /// Classical instructions that drain buffers.
    FastForwarding,
    /// Gates equal to their own inverse.
    SelfInverse,
    /// Rx, Ry and Rz.
    Rotation,
    /// R and Ph.
    Phase,
    /// Custom gates carrying a math function.
    Math,
    Allocate,
    Deallocate,
    Measure,
    Flush,
    Barrier,
    H,
    X,
    Y,
    Z,
    S,
    Sdag,
    T,
    Tdag,
    SqrtX,
    SqrtXdag,
    Swap,
    Entangle,
    Rx,
    Ry,
    Rz,
    R,
    Ph,
    /// A custom gate, by name.
    Custom(String),
}

impl GateClass {
    /// Classes of the built-in gates, as returned by [`Gate::class`].
    pub const BUILTIN: [GateClass; 22] = {
        use GateClass::*;
        [
            Allocate, Deallocate, Measure, Flush, Barrier, H, X, Y, Z, S, Sdag, T, Tdag, SqrtX,
            SqrtXdag, Swap, Entangle, Rx, Ry, Rz, R, Ph,
        ]
    };

    /// The chain from this class up to [`GateClass::Basic`], most specific
    /// first. With `math`, a custom class passes through
    /// [`GateClass::Math`].
    pub fn ancestry(&self, math: bool) -> Vec<GateClass> {
        let mut parent = match self {
            GateClass::Custom(_) if math => Some(GateClass::Math),
            _ => self.parent(),
        };
        let mut chain = vec![self.clone()];
        while let Some(next) = parent {
            parent = next.parent();
            chain.push(next);
        }
        chain
    }

    /// The parent class, `None` for [`GateClass::Basic`].
    ///
    /// Custom classes report `Basic`; math gates are routed through
    /// [`GateClass::Math`] by [`Gate::ancestry`].
    pub fn parent(&self) -> Option<GateClass> {
        use GateClass::*;
        match self {
            Basic => None,
            H | X | Y | Z | Swap => Some(SelfInverse),
            Rx | Ry | Rz => Some(Rotation),
            R | Ph => Some(Phase),
            Allocate => Some(ClassicalInstruction),
            Deallocate | Measure | Flush => Some(FastForwarding),
            FastForwarding => Some(ClassicalInstruction),
            ClassicalInstruction | SelfInverse | Rotation | Phase | Math => Some(Basic),
            Barrier | S | Sdag | T | Tdag | SqrtX | SqrtXdag | Entangle | Custom(_) => {
                Some(Basic)
            }
        }
    }

    /// Parse a class from a lower-case gate name such as `"rz"` or `"h"`.
    ///
    /// Unknown names become [`GateClass::Custom`].
    pub fn from_name(name: &str) -> GateClass {
        use GateClass::*;
        match name.to_ascii_lowercase().as_str() {
            "basic" => Basic,
            "classical" => ClassicalInstruction,
            "rotation" => Rotation,
            "phase" => Phase,
            "math" => Math,
            "allocate" => Allocate,
            "deallocate" => Deallocate,
            "measure" => Measure,
            "flush" => Flush,
            "barrier" => Barrier,
            "h" => H,
            "x" => X,
            "y" => Y,
            "z" => Z,
            "s" => S,
            "sdag" => Sdag,
            "t" => T,
            "tdag" => Tdag,
            "sqrtx" => SqrtX,
            "sqrtxdag" => SqrtXdag,
            "swap" => Swap,
            "entangle" => Entangle,
            "rx" => Rx,
            "ry" => Ry,
            "rz" => Rz,
            "r" => R,
            "ph" => Ph,
            _ => Custom(name.to_string()),
        }
    }
}

impl fmt::Display for GateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateClass::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}
