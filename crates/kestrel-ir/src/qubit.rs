//! Qubit identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a qubit, unique per driver while the qubit is live.
///
/// The value `-1` ([`QubitId::INVALID`]) marks a deallocated or otherwise
/// invalid reference. Commands never treat two invalid ids as the same qubit,
/// see [`QubitId::same_qubit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitId(pub i64);

impl QubitId {
    /// The invalid id.
    pub const INVALID: QubitId = QubitId(-1);

    /// Whether this id refers to a live qubit slot.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Identity comparison used by command equality: invalid ids match nothing.
    #[inline]
    pub fn same_qubit(self, other: QubitId) -> bool {
        self.is_valid() && self.0 == other.0
    }

    /// The id as a physical location index, if valid.
    pub fn index(self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "q{}", self.0)
        } else {
            write!(f, "q?")
        }
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(i64::from(id))
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(i64::try_from(id).unwrap_or(-1))
    }
}
