//! Kestrel Compiler Pipeline
//!
//! This crate turns a stream of [`Command`](kestrel_ir::Command)s into one a
//! restricted device can run. Commands flow through an ordered list of
//! stages owned by a [`MainEngine`]; each stage decides what the stages
//! after it can run and rewrites, buffers or forwards accordingly.
//!
//! # Architecture
//!
//! ```text
//! MainEngine ── owns ──► QubitArena (ids, measurement results)
//!     │
//!     ▼
//! AutoReplacer ─► TagRemover ─► InstructionFilter ─► LocalOptimizer
//!     │
//!     ▼
//! Mapper (manual / fixed / linear / grid) ─► ConnectivityEnforcer
//!     │
//!     ▼
//! Backend (last stage: answers availability, consumes commands)
//! ```
//!
//! Stages never hold references to each other. Each call to
//! [`Engine::receive`] gets a [`Pipeline`] over the remaining stages and
//! the driver's arena.
//!
//! # Example: Compile to CNOT and Rotations on a Ring
//!
//! ```rust
//! use kestrel_compile::engines::CommandRecorder;
//! use kestrel_compile::setups::{self, GateSelection, SetupConfig};
//! use kestrel_compile::MainEngine;
//! use kestrel_ir::{Command, Gate};
//!
//! let config = SetupConfig {
//!     one_qubit_gates: GateSelection::only(["rx", "ry", "rz", "h"]),
//!     ..SetupConfig::default()
//! };
//! let backend = CommandRecorder::new();
//! let received = backend.received();
//! let mut eng = MainEngine::builder()
//!     .with_engines(setups::linear(4, true, &config).unwrap())
//!     .with_backend(backend)
//!     .build()
//!     .unwrap();
//!
//! let qubits = eng.allocate_qureg(4).unwrap();
//! eng.apply_gate(Gate::H, &[qubits[0]]).unwrap();
//! eng.apply(Command::cnot(qubits[0], qubits[2])).unwrap();
//! eng.flush(true).unwrap();
//!
//! assert!(received.commands().iter().all(|c| c.qubit_count() <= 2));
//! ```
//!
//! # Built-in Stages
//!
//! | Stage | Purpose |
//! |-------|---------|
//! | [`engines::AutoReplacer`] | Decompose what downstream cannot run |
//! | [`engines::LocalOptimizer`] | Cancel inverse pairs, merge rotations |
//! | [`engines::ManualMapper`] | Fixed logical-to-physical function |
//! | [`engines::FixedTopologyMapper`] | Exhaustive placement on a small device |
//! | [`engines::LinearMapper`] / [`engines::GridMapper`] | Swap insertion |
//! | [`engines::ConnectivityEnforcer`] | Orient two-qubit gates along couplings |
//! | [`engines::InstructionFilter`] | Availability by predicate |
//! | [`engines::TagRemover`] / [`engines::CommandModifier`] | Rewrite in place |
//! | [`engines::CommandRecorder`] | Recording backend |

pub mod arena;
pub mod engine;
pub mod engines;
pub mod error;
pub mod main_engine;
pub mod setups;

pub use arena::QubitArena;
pub use engine::{Downstream, Engine, Pipeline};
pub use error::{CompileError, CompileResult};
pub use main_engine::{DEFAULT_MAX_ENGINES, MainEngine, MainEngineBuilder};
pub use setups::SetupConfig;
