//! Preset engine lists.
//!
//! Every preset runs three rounds of decomposition, each followed by tag
//! removal, a filter and a local optimizer:
//!
//! 1. Math gates are decomposed.
//! 2. Gates on more than two qubits are decomposed.
//! 3. Everything outside the configured [`GateSet`] is decomposed.
//!
//! The chain and grid presets put the mapper between the second and third
//! round, so the last round sees physical ids and may still rewrite the
//! swaps the mapper introduces. Their couplings are undirected and every
//! rewrite of a two-qubit gate stays on the same pair.
//!
//! The fixed-device preset places its mapper and direction enforcer after
//! all three rounds, so they see the final two-qubit gates. A fourth round
//! lowers the Hadamards and CNOTs the enforcer adds to the gate set, which
//! keeps every two-qubit gate on its coupling.

mod config;
mod gate_set;

use std::sync::Arc;

use kestrel_ir::{Command, QubitId};

pub use config::{ENV_CACHE_SIZE, ENV_MAX_DECOMPOSITION_DEPTH, SetupConfig, TopologyConfig};
pub use gate_set::{AnyGate, GatePattern, GateSelection, GateSet};

use crate::engine::{Downstream, Engine};
use crate::engines::{
    AutoReplacer, ConnectivityEnforcer, DEFAULT_FIXED_CONNECTIONS, DecompositionRuleSet,
    FixedTopologyMapper, GridMapper, InstructionFilter, LinearMapper, LocalOptimizer, TagRemover,
    default_rule_set,
};
use crate::error::CompileResult;

/// Engines for a restricted gate set without mapping.
pub fn restricted_gate_set(config: &SetupConfig) -> CompileResult<Vec<Box<dyn Engine>>> {
    Rounds::new(config)?.build(Vec::new())
}

/// Engines for a chain of `num_qubits` locations, a ring when `cyclic`.
pub fn linear(
    num_qubits: u32,
    cyclic: bool,
    config: &SetupConfig,
) -> CompileResult<Vec<Box<dyn Engine>>> {
    Rounds::new(config)?.build(vec![Box::new(LinearMapper::new(num_qubits, cyclic))])
}

/// Engines for a `rows` by `columns` grid with optional preferred
/// locations.
pub fn grid(
    rows: u32,
    columns: u32,
    placement: &[(u32, u32)],
    config: &SetupConfig,
) -> CompileResult<Vec<Box<dyn Engine>>> {
    let mapper = GridMapper::new(rows, columns).with_placement(
        placement
            .iter()
            .map(|&(logical, location)| (QubitId::from(logical), location)),
    );
    Rounds::new(config)?.build(vec![Box::new(mapper)])
}

/// Engines for a small device with directed couplings, the built-in
/// five-location device if `connections` is `None`.
pub fn fixed(
    connections: Option<&[(u32, u32)]>,
    config: &SetupConfig,
) -> CompileResult<Vec<Box<dyn Engine>>> {
    let connections = connections.unwrap_or(&DEFAULT_FIXED_CONNECTIONS).to_vec();
    let device: Vec<Box<dyn Engine>> = vec![
        Box::new(FixedTopologyMapper::with_connections(connections.iter().copied())),
        Box::new(ConnectivityEnforcer::new(connections)),
    ];
    Rounds::new(config)?.build_directed(device)
}

/// Engines for whatever `config.topology` names.
pub fn engine_list(config: &SetupConfig) -> CompileResult<Vec<Box<dyn Engine>>> {
    match &config.topology {
        TopologyConfig::None => restricted_gate_set(config),
        TopologyConfig::Linear { num_qubits, cyclic } => linear(*num_qubits, *cyclic, config),
        TopologyConfig::Grid {
            rows,
            columns,
            placement,
        } => grid(*rows, *columns, placement, config),
        TopologyConfig::Fixed { connections } => fixed(connections.as_deref(), config),
    }
}

struct Rounds {
    rules: Arc<DecompositionRuleSet>,
    gate_set: GateSet,
    cache_size: usize,
    max_depth: usize,
}

impl Rounds {
    fn new(config: &SetupConfig) -> CompileResult<Self> {
        config.validate()?;
        Ok(Self {
            rules: Arc::new(default_rule_set()),
            gate_set: config.gate_set()?,
            cache_size: config.cache_size,
            max_depth: config.max_decomposition_depth,
        })
    }

    fn round(&self, filter: InstructionFilter) -> [Box<dyn Engine>; 4] {
        [
            Box::new(AutoReplacer::new(Arc::clone(&self.rules)).with_max_depth(self.max_depth)),
            Box::new(TagRemover::new()),
            Box::new(filter),
            Box::new(LocalOptimizer::new(self.cache_size)),
        ]
    }

    fn build(self, device: Vec<Box<dyn Engine>>) -> CompileResult<Vec<Box<dyn Engine>>> {
        let gate_set = self.gate_set.clone();
        let mut engines: Vec<Box<dyn Engine>> = Vec::new();
        engines.extend(self.round(InstructionFilter::new(high_level_gates)));
        engines.extend(self.round(InstructionFilter::new(one_and_two_qubit_gates)));
        engines.extend(device);
        engines.extend(self.round(InstructionFilter::accepting(move |cmd| {
            gate_set.allows(cmd)
        })));
        Ok(engines)
    }

    /// All three rounds, then `device`, then one more gate-set round.
    fn build_directed(self, device: Vec<Box<dyn Engine>>) -> CompileResult<Vec<Box<dyn Engine>>> {
        let gate_set = self.gate_set.clone();
        let allowed = move |cmd: &Command| gate_set.allows(cmd);
        let mut engines: Vec<Box<dyn Engine>> = Vec::new();
        engines.extend(self.round(InstructionFilter::new(high_level_gates)));
        engines.extend(self.round(InstructionFilter::new(one_and_two_qubit_gates)));
        engines.extend(self.round(InstructionFilter::accepting(allowed.clone())));
        engines.extend(device);
        engines.extend(self.round(InstructionFilter::accepting(allowed)));
        Ok(engines)
    }
}

/// Rejects math gates unless a later stage runs them.
fn high_level_gates(cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
    if !cmd.gate().is_math() {
        return Ok(true);
    }
    next.is_available(cmd)
}

/// Rejects gates on more than two qubits unless a later stage runs them.
fn one_and_two_qubit_gates(cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
    if cmd.qubit_count() <= 2 {
        return Ok(true);
    }
    next.is_available(cmd)
}
