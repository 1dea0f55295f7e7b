//! Exhaustive placement on a small fixed device.

use itertools::Itertools;
use kestrel_ir::{Command, Gate, QubitId};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{Mapper, QubitMapping, map_command, routed_pair};
use crate::engine::{Downstream, Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Directed couplings of the built-in five-location device.
pub const DEFAULT_FIXED_CONNECTIONS: [(u32, u32); 11] = [
    (0, 1),
    (1, 0),
    (1, 2),
    (1, 3),
    (1, 4),
    (2, 1),
    (2, 3),
    (2, 4),
    (3, 1),
    (3, 4),
    (4, 3),
];

/// Buffers a whole batch, then picks the placement that needs no swaps and
/// the fewest reversed two-qubit operations.
///
/// Controlled two-qubit commands count as directed interactions (control
/// to target); uncontrolled two-qubit commands count in either direction.
/// A placement costs the number of directed interactions that only the
/// reversed coupling supports, and is infeasible if any pair has no
/// coupling at all. The current placement is kept when it is feasible and
/// free of reversals; otherwise every permutation of locations over the
/// allocated qubits is scored. This is only tractable because the device is
/// small.
///
/// Qubits are numbered in allocation order. The mapping is cleared at the
/// end of the flush that sent the batch.
pub struct FixedTopologyMapper {
    connections: FxHashSet<(u32, u32)>,
    num_locations: u32,
    mapping: QubitMapping,
    buffer: Vec<Command>,
    directed: FxHashMap<(QubitId, QubitId), usize>,
    undirected: FxHashSet<(QubitId, QubitId)>,
}

impl FixedTopologyMapper {
    /// Mapper for the built-in five-location device.
    pub fn new() -> Self {
        Self::with_connections(DEFAULT_FIXED_CONNECTIONS)
    }

    /// Mapper for a device with the given directed couplings. The device has
    /// one location past the highest coupled one.
    pub fn with_connections(connections: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let connections: FxHashSet<(u32, u32)> = connections.into_iter().collect();
        let num_locations = connections
            .iter()
            .map(|&(a, b)| a.max(b) + 1)
            .max()
            .unwrap_or(0);
        Self {
            connections,
            num_locations,
            mapping: QubitMapping::new(),
            buffer: Vec::new(),
            directed: FxHashMap::default(),
            undirected: FxHashSet::default(),
        }
    }

    /// Number of physical locations.
    pub fn num_locations(&self) -> u32 {
        self.num_locations
    }

    fn store(&mut self, cmd: Command) -> CompileResult<()> {
        match cmd.gate() {
            Gate::Allocate => self.place(&cmd)?,
            gate if !gate.is_classical_instruction() => {
                if let Some((a, b)) = routed_pair(&cmd)? {
                    if cmd.control_count() == 1 {
                        *self.directed.entry((a, b)).or_default() += 1;
                    } else {
                        self.undirected.insert((a.min(b), a.max(b)));
                    }
                }
            }
            _ => {}
        }
        self.buffer.push(cmd);
        Ok(())
    }

    fn place(&mut self, cmd: &Command) -> CompileResult<()> {
        let Some(logical) = cmd.target() else {
            return Ok(());
        };
        if self.mapping.physical(logical).is_some() {
            return Ok(());
        }
        let location = self.mapping.max_physical().map_or(0, |max| max + 1);
        if location >= self.num_locations {
            return Err(CompileError::OverCapacity {
                required: self.mapping.len() + 1,
                available: self.num_locations as usize,
            });
        }
        self.mapping.insert(logical, location);
        Ok(())
    }

    /// Reversed-operation count of a placement, `None` if infeasible.
    fn cost(&self, location: impl Fn(QubitId) -> Option<u32>) -> Option<usize> {
        for &(a, b) in &self.undirected {
            let (pa, pb) = (location(a)?, location(b)?);
            if !self.connections.contains(&(pa, pb)) && !self.connections.contains(&(pb, pa)) {
                return None;
            }
        }
        let mut cost = 0;
        for (&(control, target), &weight) in &self.directed {
            let (pc, pt) = (location(control)?, location(target)?);
            if self.connections.contains(&(pc, pt)) {
                continue;
            }
            if !self.connections.contains(&(pt, pc)) {
                return None;
            }
            cost += weight;
        }
        Some(cost)
    }

    fn solve(&mut self) -> CompileResult<()> {
        if self.directed.is_empty() && self.undirected.is_empty() {
            return Ok(());
        }
        let current = self.cost(|q| self.mapping.physical(q));
        if current == Some(0) {
            return Ok(());
        }

        let logical: Vec<QubitId> = self.mapping.iter().map(|(l, _)| l).collect();
        let mut best: Option<(usize, Vec<u32>)> = None;
        for locations in (0..self.num_locations).permutations(logical.len()) {
            let cost = self.cost(|q| {
                logical
                    .iter()
                    .position(|l| *l == q)
                    .map(|i| locations[i])
            });
            if let Some(cost) = cost {
                if best.as_ref().is_none_or(|(b, _)| cost < *b) {
                    best = Some((cost, locations));
                }
            }
        }
        let (cost, locations) = best.ok_or(CompileError::NoFeasibleMapping)?;
        debug!(qubits = logical.len(), cost, "found placement");
        self.mapping = logical.into_iter().zip(locations).collect();
        Ok(())
    }

    fn run(&mut self, next: &mut Pipeline<'_>) -> CompileResult<()> {
        self.solve()?;
        let buffered = std::mem::take(&mut self.buffer);
        let mapped = buffered
            .iter()
            .map(|cmd| {
                if cmd.is_flush() {
                    Ok(cmd.clone())
                } else {
                    map_command(cmd, &self.mapping)
                }
            })
            .collect::<CompileResult<Vec<_>>>()?;
        next.send(mapped)?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.mapping.clear();
        self.directed.clear();
        self.undirected.clear();
    }
}

impl Default for FixedTopologyMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for FixedTopologyMapper {
    fn name(&self) -> &str {
        "fixed_topology_mapper"
    }

    fn is_available(&self, cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
        if routed_pair(cmd).is_err() {
            return Ok(false);
        }
        next.is_available(cmd)
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            let flush = cmd.is_flush();
            self.store(cmd)?;
            if flush {
                self.run(next)?;
            }
        }
        Ok(())
    }
}

impl Mapper for FixedTopologyMapper {
    fn current_mapping(&self) -> QubitMapping {
        self.mapping.clone()
    }

    fn set_current_mapping(&mut self, mapping: QubitMapping) {
        self.mapping = mapping;
    }
}
