//! Swap-inserting mappers for chains, rings and grids.

use kestrel_ir::{Command, Gate, QubitId};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::topology::{GridTopology, LinearTopology, Topology};
use super::{Mapper, QubitMapping, map_command, routed_pair};
use crate::engine::{Downstream, Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Mapper over a chain or ring of locations.
pub type LinearMapper = RoutingMapper<LinearTopology>;

/// Mapper over a rectangular grid.
pub type GridMapper = RoutingMapper<GridTopology>;

/// Maintains the mapping incrementally and moves qubits next to each other
/// before every two-qubit command.
///
/// - Allocation places a qubit at its placement override when that location
///   is free, else at the lowest free location.
/// - When the operands of a two-qubit command are not adjacent, the first
///   operand walks along a shortest path towards the second, one swap per
///   step. A step into a free location is emitted as allocate, swap,
///   deallocate so the location is live for the swap.
/// - Commands on more than two qubits cannot be routed.
///
/// The mapping is cleared after every flush.
pub struct RoutingMapper<T: Topology> {
    topology: T,
    mapping: QubitMapping,
    placement: FxHashMap<QubitId, u32>,
    num_swaps: usize,
}

impl<T: Topology> RoutingMapper<T> {
    /// Create a mapper over `topology`.
    pub fn with_topology(topology: T) -> Self {
        Self {
            topology,
            mapping: QubitMapping::new(),
            placement: FxHashMap::default(),
            num_swaps: 0,
        }
    }

    /// Preferred locations for logical qubits, used when free at allocation.
    #[must_use]
    pub fn with_placement(mut self, placement: impl IntoIterator<Item = (QubitId, u32)>) -> Self {
        self.placement = placement.into_iter().collect();
        self
    }

    /// The topology.
    pub fn topology(&self) -> &T {
        &self.topology
    }

    /// Swaps inserted since construction.
    pub fn num_swaps(&self) -> usize {
        self.num_swaps
    }

    fn allocate(&mut self, cmd: &Command) -> CompileResult<()> {
        let Some(logical) = cmd.target() else {
            return Ok(());
        };
        if self.mapping.physical(logical).is_some() {
            return Ok(());
        }
        let capacity = self.topology.num_locations();
        let preferred = self
            .placement
            .get(&logical)
            .copied()
            .filter(|&p| p < capacity && self.mapping.is_free(p));
        let location = preferred
            .or_else(|| (0..capacity).find(|&p| self.mapping.is_free(p)))
            .ok_or(CompileError::OverCapacity {
                required: self.mapping.len() + 1,
                available: capacity as usize,
            })?;
        trace!(qubit = %logical, location, "placing qubit");
        self.mapping.insert(logical, location);
        Ok(())
    }

    fn physical(&self, qubit: QubitId, cmd: &Command) -> CompileResult<u32> {
        self.mapping
            .physical(qubit)
            .ok_or_else(|| CompileError::UnmappedQubit {
                qubit,
                command: cmd.to_string(),
            })
    }

    /// Move `a` next to `b`, emitting the swaps.
    fn route(
        &mut self,
        a: QubitId,
        b: QubitId,
        cmd: &Command,
        next: &mut Pipeline<'_>,
    ) -> CompileResult<()> {
        let mut from = self.physical(a, cmd)?;
        let to = self.physical(b, cmd)?;
        let mut inserted = 0;
        while !self.topology.are_adjacent(from, to) {
            let hop = self.topology.next_hop(from, to);
            let (pf, ph) = (QubitId::from(from), QubitId::from(hop));
            let swap = Command::pair(Gate::Swap, pf, ph);
            if self.mapping.is_free(hop) {
                next.send(vec![Command::allocate(ph), swap, Command::deallocate(pf)])?;
            } else {
                next.send_one(swap)?;
            }
            self.mapping.swap(from, hop);
            from = hop;
            inserted += 1;
        }
        if inserted > 0 {
            self.num_swaps += inserted;
            debug!(command = %cmd, swaps = inserted, "routed");
        }
        Ok(())
    }

    fn process(&mut self, cmd: Command, next: &mut Pipeline<'_>) -> CompileResult<()> {
        match cmd.gate() {
            Gate::Flush => {
                next.send_one(cmd)?;
                self.mapping.clear();
                Ok(())
            }
            Gate::Allocate => {
                self.allocate(&cmd)?;
                next.send_one(map_command(&cmd, &self.mapping)?)
            }
            Gate::Deallocate => {
                next.send_one(map_command(&cmd, &self.mapping)?)?;
                if let Some(logical) = cmd.target() {
                    self.mapping.remove(logical);
                }
                Ok(())
            }
            _ => {
                if let Some((a, b)) = routed_pair(&cmd)? {
                    self.route(a, b, &cmd, next)?;
                }
                next.send_one(map_command(&cmd, &self.mapping)?)
            }
        }
    }
}

impl RoutingMapper<LinearTopology> {
    /// Create a mapper over a chain of `num_qubits` locations, closed into a
    /// ring when `cyclic`.
    pub fn new(num_qubits: u32, cyclic: bool) -> Self {
        Self::with_topology(LinearTopology::new(num_qubits, cyclic))
    }
}

impl RoutingMapper<GridTopology> {
    /// Create a mapper over a `rows` by `columns` grid.
    pub fn new(rows: u32, columns: u32) -> Self {
        Self::with_topology(GridTopology::new(rows, columns))
    }
}

impl<T: Topology> Engine for RoutingMapper<T> {
    fn name(&self) -> &str {
        "routing_mapper"
    }

    fn is_available(&self, cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
        if routed_pair(cmd).is_err() {
            return Ok(false);
        }
        next.is_available(cmd)
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            self.process(cmd, next)?;
        }
        Ok(())
    }
}

impl<T: Topology> Mapper for RoutingMapper<T> {
    fn current_mapping(&self) -> QubitMapping {
        self.mapping.clone()
    }

    fn set_current_mapping(&mut self, mapping: QubitMapping) {
        self.mapping = mapping;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{CommandRecorder, ReceivedCommands};
    use crate::main_engine::MainEngine;

    fn q(id: i64) -> QubitId {
        QubitId(id)
    }

    fn run(mapper: impl Engine + 'static, commands: Vec<Command>) -> CompileResult<ReceivedCommands> {
        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::builder()
            .with_engine(mapper)
            .with_backend(backend)
            .build()?;
        eng.send(commands)?;
        Ok(received)
    }

    fn allocations(n: i64) -> Vec<Command> {
        (0..n).map(|i| Command::allocate(q(i))).collect()
    }

    #[test]
    fn test_adjacent_pair_needs_no_swap() {
        let mut cmds = allocations(3);
        cmds.push(Command::cnot(q(1), q(2)));
        let received = run(LinearMapper::new(3, false), cmds).unwrap();
        assert_eq!(received.commands()[3], Command::cnot(q(1), q(2)));
        assert_eq!(received.len(), 4);
    }

    #[test]
    fn test_chain_inserts_swaps() {
        let mut cmds = allocations(4);
        cmds.push(Command::cnot(q(0), q(3)));
        let received = run(LinearMapper::new(4, false), cmds).unwrap();
        let out = received.snapshot();
        assert_eq!(out[4], Command::pair(Gate::Swap, q(0), q(1)));
        assert_eq!(out[5], Command::pair(Gate::Swap, q(1), q(2)));
        assert_eq!(out[6], Command::cnot(q(2), q(3)));
    }

    #[test]
    fn test_ring_takes_short_way() {
        let mut cmds = allocations(6);
        cmds.push(Command::cnot(q(0), q(4)));
        let received = run(LinearMapper::new(6, true), cmds).unwrap();
        let out = received.snapshot();
        assert_eq!(out[6], Command::pair(Gate::Swap, q(0), q(5)));
        assert_eq!(out[7], Command::cnot(q(5), q(4)));
    }

    #[test]
    fn test_move_into_free_location() {
        let cmds = vec![
            Command::allocate(q(0)),
            Command::allocate(q(1)),
            Command::allocate(q(2)),
            Command::deallocate(q(1)),
            Command::cnot(q(0), q(2)),
        ];
        let received = run(LinearMapper::new(3, false), cmds).unwrap();
        let out = received.snapshot();
        assert_eq!(
            out[4..].to_vec(),
            vec![
                Command::allocate(q(1)),
                Command::pair(Gate::Swap, q(0), q(1)),
                Command::deallocate(q(0)),
                Command::cnot(q(1), q(2)),
            ]
        );
    }

    #[test]
    fn test_over_capacity() {
        let err = run(LinearMapper::new(2, false), allocations(3));
        assert!(matches!(
            err,
            Err(CompileError::OverCapacity {
                required: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_three_qubit_gate_unroutable() {
        let mut cmds = allocations(3);
        cmds.push(Command::controlled(Gate::X, &[q(0), q(1)], q(2)).unwrap());
        assert!(matches!(
            run(GridMapper::new(2, 2), cmds),
            Err(CompileError::Unroutable { .. })
        ));
    }

    #[test]
    fn test_grid_placement_override() {
        let mapper = GridMapper::new(2, 3).with_placement([(q(0), 5), (q(1), 5)]);
        let received = run(mapper, allocations(2)).unwrap();
        assert_eq!(
            received.snapshot(),
            vec![Command::allocate(q(5)), Command::allocate(q(0))]
        );
    }

    #[test]
    fn test_grid_routes_rows_first() {
        let mut cmds = allocations(9);
        cmds.push(Command::cnot(q(0), q(8)));
        let received = run(GridMapper::new(3, 3), cmds).unwrap();
        let out = received.snapshot();
        assert_eq!(out[9], Command::pair(Gate::Swap, q(0), q(3)));
        assert_eq!(out[10], Command::pair(Gate::Swap, q(3), q(6)));
        assert_eq!(out[11], Command::pair(Gate::Swap, q(6), q(7)));
        assert_eq!(out[12], Command::cnot(q(7), q(8)));
    }

    #[test]
    fn test_flush_clears_mapping() {
        let mut mapper = LinearMapper::new(3, false);
        mapper.set_current_mapping([(q(0), 2)].into_iter().collect());
        assert_eq!(mapper.current_mapping().physical(q(0)), Some(2));

        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::builder()
            .with_engine(mapper)
            .with_backend(backend)
            .build()
            .unwrap();
        eng.send(vec![Command::single(Gate::H, q(0)), Command::flush()])
            .unwrap();
        assert_eq!(received.commands()[0], Command::single(Gate::H, q(2)));
        assert!(matches!(
            eng.send(vec![Command::single(Gate::H, q(0))]),
            Err(CompileError::UnmappedQubit { .. })
        ));
    }
}
