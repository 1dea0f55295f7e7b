//! Kestrel Command Intermediate Representation
//!
//! This crate provides the unit that flows through a Kestrel compiler
//! pipeline: a [`Command`], one gate application with target qubit groups,
//! control qubits with an activation pattern, and metadata tags.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`], with [`QubitId::INVALID`] marking released ids
//! - **Gates**: [`Gate`], a closed set of gate kinds, and [`CustomGate`] for
//!   user-defined and math gates
//! - **Gate classes**: [`GateClass`], the fixed ancestry used to index
//!   decomposition rules
//! - **Commands**: [`Command`] and its [`ControlState`]
//! - **Tags**: [`Tag`] metadata carried through every rewrite
//!
//! # Example: A Controlled Rotation
//!
//! ```rust
//! use kestrel_ir::{Command, ControlState, Gate, QubitId};
//!
//! let cmd = Command::single(Gate::rz(0.5), QubitId(2))
//!     .with_control_state(&[QubitId(0)], ControlState::parse("0").unwrap())
//!     .unwrap();
//!
//! assert!(cmd.has_negative_controls());
//! assert_eq!(cmd.to_string(), "Rz(0.5) | q2 ctrl !q0");
//!
//! let merged = cmd.merge(&cmd).unwrap();
//! assert_eq!(merged.gate(), &Gate::Rz(1.0));
//! ```
//!
//! # Gate Capabilities
//!
//! | Gate | Invertible | Mergeable | Notes |
//! |------|------------|-----------|-------|
//! | `H`, `X`, `Y`, `Z`, `Swap` | self-inverse | no | |
//! | `S`, `T`, `SqrtX` (+ daggers) | yes | no | |
//! | `Rx`, `Ry`, `Rz` | yes | yes | angle mod 4pi |
//! | `R`, `Ph` | yes | yes | angle mod 2pi |
//! | `Allocate`, `Deallocate`, `Measure`, `Flush` | no | no | always executable |
//! | `Custom` | if declared | no | optional math function |

pub mod command;
pub mod error;
pub mod gate;
pub mod qubit;
pub mod tag;

pub use command::{Command, ControlState};
pub use error::{IrError, IrResult};
pub use gate::{
    ANGLE_TOLERANCE, CustomGate, Gate, GateClass, MathFunction, PHASE_PERIOD, ROTATION_PERIOD,
    angles_close, normalize_angle,
};
pub use qubit::QubitId;
pub use tag::Tag;
