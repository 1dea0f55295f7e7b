//! Logical-to-physical qubit mapping.

use kestrel_ir::QubitId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A bijection from logical qubit ids to physical locations.
///
/// Both directions are stored so lookups either way are O(1). Every
/// mutation keeps the two maps consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QubitMapping {
    /// Map from logical qubit to physical location.
    logical_to_physical: FxHashMap<QubitId, u32>,
    /// Map from physical location to logical qubit.
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl QubitMapping {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical qubit i at location i, for i in `0..num_qubits`.
    pub fn trivial(num_qubits: u32) -> Self {
        let mut mapping = Self::new();
        for i in 0..num_qubits {
            mapping.insert(QubitId::from(i), i);
        }
        mapping
    }

    /// Place `logical` at `physical`.
    ///
    /// A logical qubit previously at `physical` and a previous location of
    /// `logical` are unmapped first, so the mapping stays a bijection.
    pub fn insert(&mut self, logical: QubitId, physical: u32) {
        if let Some(old_logical) = self.physical_to_logical.get(&physical).copied() {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        if let Some(old_physical) = self.logical_to_physical.get(&logical).copied() {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Unmap `logical`, returning its location.
    pub fn remove(&mut self, logical: QubitId) -> Option<u32> {
        let physical = self.logical_to_physical.remove(&logical)?;
        self.physical_to_logical.remove(&physical);
        Some(physical)
    }

    /// Location of a logical qubit.
    pub fn physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Logical qubit at a location.
    pub fn logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Exchange the contents of two locations. Either may be free.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.remove(&p1);
        let l2 = self.physical_to_logical.remove(&p2);
        if let Some(l1) = l1 {
            self.logical_to_physical.insert(l1, p2);
            self.physical_to_logical.insert(p2, l1);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical.insert(l2, p1);
            self.physical_to_logical.insert(p1, l2);
        }
    }

    /// Whether `physical` holds no logical qubit.
    pub fn is_free(&self, physical: u32) -> bool {
        !self.physical_to_logical.contains_key(&physical)
    }

    /// Highest occupied location.
    pub fn max_physical(&self) -> Option<u32> {
        self.physical_to_logical.keys().copied().max()
    }

    /// Number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Whether nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.logical_to_physical.clear();
        self.physical_to_logical.clear();
    }

    /// Iterate over (logical, physical) pairs in logical id order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        let mut pairs: Vec<(QubitId, u32)> =
            self.logical_to_physical.iter().map(|(&l, &p)| (l, p)).collect();
        pairs.sort_unstable();
        pairs.into_iter()
    }

    /// Whether the two directions agree entry for entry.
    pub fn is_bijective(&self) -> bool {
        self.logical_to_physical.len() == self.physical_to_logical.len()
            && self
                .logical_to_physical
                .iter()
                .all(|(l, p)| self.physical_to_logical.get(p) == Some(l))
    }
}

impl FromIterator<(QubitId, u32)> for QubitMapping {
    fn from_iter<I: IntoIterator<Item = (QubitId, u32)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (logical, physical) in iter {
            mapping.insert(logical, physical);
        }
        mapping
    }
}
