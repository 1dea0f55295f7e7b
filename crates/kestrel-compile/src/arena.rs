//! Qubit slots owned by the driver.

use kestrel_ir::QubitId;

use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    live: bool,
    measurement: Option<bool>,
}

/// Arena of qubit slots indexed by id.
///
/// Ids are handed out in increasing order and never reused. Each slot holds
/// at most one measurement result.
#[derive(Debug, Clone, Default)]
pub struct QubitArena {
    slots: Vec<Slot>,
}

impl QubitArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id.
    pub fn allocate(&mut self) -> QubitId {
        let id = QubitId::from(self.slots.len());
        self.slots.push(Slot {
            live: true,
            measurement: None,
        });
        id
    }

    /// Mark a live qubit as released.
    pub fn release(&mut self, id: QubitId) -> CompileResult<()> {
        match self.slot_mut(id) {
            Some(slot) if slot.live => {
                slot.live = false;
                Ok(())
            }
            _ => Err(CompileError::QubitNotAllocated(id)),
        }
    }

    /// Whether `id` is currently allocated.
    pub fn is_live(&self, id: QubitId) -> bool {
        self.slot(id).is_some_and(|slot| slot.live)
    }

    /// Ids of every live qubit, in allocation order.
    pub fn live_qubits(&self) -> Vec<QubitId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.live)
            .map(|(index, _)| QubitId::from(index))
            .collect()
    }

    /// Number of live qubits.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.live).count()
    }

    /// Number of ids handed out so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no id has been handed out.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store the measurement outcome of `id`, replacing any earlier one.
    pub fn set_measurement_result(&mut self, id: QubitId, value: bool) -> CompileResult<()> {
        let slot = self
            .slot_mut(id)
            .ok_or(CompileError::QubitNotAllocated(id))?;
        slot.measurement = Some(value);
        Ok(())
    }

    /// Read the measurement outcome of `id`.
    pub fn measurement_result(&self, id: QubitId) -> CompileResult<bool> {
        let slot = self.slot(id).ok_or(CompileError::QubitNotAllocated(id))?;
        slot.measurement.ok_or(CompileError::NotYetMeasured(id))
    }

    fn slot(&self, id: QubitId) -> Option<&Slot> {
        self.slots.get(id.index()? as usize)
    }

    fn slot_mut(&mut self, id: QubitId) -> Option<&mut Slot> {
        self.slots.get_mut(id.index()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let mut arena = QubitArena::new();
        assert_eq!(arena.allocate(), QubitId(0));
        assert_eq!(arena.allocate(), QubitId(1));
        arena.release(QubitId(0)).unwrap();
        assert_eq!(arena.allocate(), QubitId(2));
        assert_eq!(arena.live_qubits(), vec![QubitId(1), QubitId(2)]);
    }

    #[test]
    fn test_double_release_fails() {
        let mut arena = QubitArena::new();
        let q = arena.allocate();
        arena.release(q).unwrap();
        assert!(matches!(
            arena.release(q),
            Err(CompileError::QubitNotAllocated(_))
        ));
        assert!(arena.release(QubitId::INVALID).is_err());
    }

    #[test]
    fn test_unmeasured_read_fails() {
        let mut arena = QubitArena::new();
        let q = arena.allocate();
        assert!(matches!(
            arena.measurement_result(q),
            Err(CompileError::NotYetMeasured(id)) if id == q
        ));
        arena.set_measurement_result(q, true).unwrap();
        assert!(arena.measurement_result(q).unwrap());
    }

    #[test]
    fn test_result_survives_release() {
        let mut arena = QubitArena::new();
        let q = arena.allocate();
        arena.set_measurement_result(q, false).unwrap();
        arena.release(q).unwrap();
        assert!(!arena.measurement_result(q).unwrap());
    }
}
