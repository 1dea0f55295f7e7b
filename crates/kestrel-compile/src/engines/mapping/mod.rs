//! Qubit mapping and routing.
//!
//! A mapper owns a [`QubitMapping`] from logical qubit ids to physical
//! locations and rewrites the ids of every command it forwards. Mappers for
//! restricted topologies also insert swaps so that two-qubit commands only
//! act on adjacent locations.
//!
//! Every mapper starts a flush-delimited batch with an empty mapping. A
//! caller that wants a mapping to carry over seeds it through
//! [`Mapper::set_current_mapping`]. The fixed-topology mapper clears its
//! mapping while handling the flush, after the mapped batch went out; the
//! routing mappers clear it right after forwarding the flush.

mod fixed;
mod layout;
mod manual;
mod routing;
mod topology;

use kestrel_ir::{Command, Gate, QubitId, Tag};

use crate::engine::Engine;
use crate::error::{CompileError, CompileResult};

pub use fixed::{DEFAULT_FIXED_CONNECTIONS, FixedTopologyMapper};
pub use layout::QubitMapping;
pub use manual::ManualMapper;
pub use routing::{GridMapper, LinearMapper, RoutingMapper};
pub use topology::{GridTopology, LinearTopology, Topology};

/// A stage that owns a logical-to-physical mapping.
pub trait Mapper: Engine {
    /// A copy of the current mapping.
    fn current_mapping(&self) -> QubitMapping;

    /// Replace the current mapping.
    fn set_current_mapping(&mut self, mapping: QubitMapping);
}

/// Rewrite every qubit id of `cmd` through `mapping`.
///
/// Measurements additionally carry their logical id as a
/// [`Tag::LogicalQubitId`] so the result can be stored under it.
pub fn map_command(cmd: &Command, mapping: &QubitMapping) -> CompileResult<Command> {
    let mut mapped = cmd.clone().map_qubits(|qubit| {
        mapping
            .physical(qubit)
            .map(QubitId::from)
            .ok_or_else(|| CompileError::UnmappedQubit {
                qubit,
                command: cmd.to_string(),
            })
    })?;
    if matches!(cmd.gate(), Gate::Measure) {
        if let Some(logical) = cmd.target() {
            mapped.tags_mut().push(Tag::LogicalQubitId(logical));
        }
    }
    Ok(mapped)
}

/// Distinct qubits of a command that is not a classical instruction, or
/// `Unroutable` if it touches more than two.
fn routed_pair(cmd: &Command) -> CompileResult<Option<(QubitId, QubitId)>> {
    let qubits = distinct_qubits(cmd);
    match qubits.as_slice() {
        [] | [_] => Ok(None),
        [a, b] => Ok(Some((*a, *b))),
        more => Err(CompileError::Unroutable {
            command: cmd.to_string(),
            reason: format!("acts on {} qubits", more.len()),
        }),
    }
}

fn distinct_qubits(cmd: &Command) -> Vec<QubitId> {
    use itertools::Itertools;
    cmd.all_qubits().unique().collect()
}
