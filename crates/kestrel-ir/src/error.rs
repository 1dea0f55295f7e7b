//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur when building or transforming commands.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Gate has no inverse.
    #[error("Gate '{0}' is not invertible")]
    NotInvertible(String),

    /// Two gates (or commands) cannot be merged into one.
    #[error("Cannot merge '{gate}' with '{other}'")]
    NotMergeable {
        /// The first gate.
        gate: String,
        /// The gate it was asked to merge with.
        other: String,
    },

    /// Control pattern does not have one entry per control qubit.
    #[error("Control state has {states} entries but command has {controls} control qubits")]
    ControlStateMismatch {
        /// Number of control qubits.
        controls: usize,
        /// Number of entries in the control pattern.
        states: usize,
    },

    /// Measurement cannot be controlled.
    #[error("Measurement cannot carry control qubits")]
    ControlledMeasurement,

    /// Control pattern string contains something other than '0' and '1'.
    #[error("Invalid control state '{0}': expected a string of '0' and '1'")]
    InvalidControlState(String),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
