//! Error types for the compile crate.

use kestrel_ir::{IrError, QubitId};
use thiserror::Error;

/// Errors that can occur while commands flow through the pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// IR error.
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// A stage tried to reach past the end of the pipeline.
    #[error("No next engine: the last stage must answer availability and consume commands")]
    NoNextEngine,

    /// No rule decomposes a command the downstream stages cannot run.
    #[error("No gate decomposition found for '{command}'")]
    NoGateDecomposition {
        /// The offending command.
        command: String,
    },

    /// Nested decompositions exceeded the configured depth.
    #[error("Decomposition of '{command}' exceeded the maximum depth of {depth}")]
    DecompositionTooDeep {
        /// The configured depth.
        depth: usize,
        /// The command being decomposed when the limit was hit.
        command: String,
    },

    /// A decomposition chooser returned an index outside the candidate list.
    #[error("Decomposition chooser picked rule {index} of {candidates}")]
    InvalidChoice {
        /// Returned index.
        index: usize,
        /// Number of candidates offered.
        candidates: usize,
    },

    /// Measurement result read before the backend produced one.
    #[error("Qubit {0} has not been measured yet")]
    NotYetMeasured(QubitId),

    /// Qubit id is not live in the driver's arena.
    #[error("Qubit {0} is not allocated")]
    QubitNotAllocated(QubitId),

    /// More logical qubits than physical locations.
    #[error("Over capacity: {required} qubits required but only {available} available")]
    OverCapacity {
        /// Number of locations needed.
        required: usize,
        /// Number of locations the topology provides.
        available: usize,
    },

    /// No placement satisfies every interaction without exchange operations.
    #[error("Circuit cannot be mapped without exchange operations")]
    NoFeasibleMapping,

    /// A command references a logical qubit the mapper does not know.
    #[error("Qubit {qubit} has no physical location (in '{command}')")]
    UnmappedQubit {
        /// The unmapped logical id.
        qubit: QubitId,
        /// The offending command.
        command: String,
    },

    /// The mapper cannot route a command.
    #[error("Cannot route '{command}': {reason}")]
    Unroutable {
        /// The offending command.
        command: String,
        /// Why routing failed.
        reason: String,
    },

    /// Neither direction of a two-qubit operation is an edge.
    #[error("Unsupported connectivity for '{command}'")]
    UnsupportedConnectivity {
        /// The offending command.
        command: String,
    },

    /// The backend refused a command.
    #[error("Command '{command}' is not supported by the backend")]
    UnsupportedCommand {
        /// The offending command.
        command: String,
    },

    /// Too many stages for the configured maximum.
    #[error("Pipeline has {engines} engines but at most {max} are allowed")]
    PipelineTooDeep {
        /// Number of stages requested.
        engines: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Stage index out of range.
    #[error("No engine at index {index} (pipeline has {len} engines)")]
    NoSuchEngine {
        /// Requested index.
        index: usize,
        /// Number of stages.
        len: usize,
    },

    /// Optimizer buffers disagree about a multi-qubit command.
    #[error("Local optimizer state inconsistent: {0}")]
    OptimizerInconsistent(String),

    /// Invalid engine or setup configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for pipeline operations.
pub type CompileResult<T> = Result<T, CompileError>;
