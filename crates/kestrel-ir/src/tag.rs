//! Metadata tags attached to commands.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::qubit::QubitId;

/// A tag carried by a command through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Part of a compute section of a conjugation.
    Compute,
    /// Part of the matching uncompute section.
    Uncompute,
    /// The qubit may start in an unknown state and must be returned to it.
    Dirty,
    /// Logical id of a measured qubit whose command was rewritten to a
    /// physical location.
    LogicalQubitId(QubitId),
    /// Free-form user tag.
    Custom(String),
}

impl Tag {
    /// Compute and uncompute markers.
    pub fn is_compute_marker(&self) -> bool {
        matches!(self, Tag::Compute | Tag::Uncompute)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Compute => write!(f, "compute"),
            Tag::Uncompute => write!(f, "uncompute"),
            Tag::Dirty => write!(f, "dirty"),
            Tag::LogicalQubitId(id) => write!(f, "logical({id})"),
            Tag::Custom(label) => write!(f, "{label}"),
        }
    }
}
