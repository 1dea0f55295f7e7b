//! Pipeline stages.
//!
//! - [`decomposition`]: rule-driven gate decomposition
//! - [`optimizer`]: per-qubit peephole cancellation and merging
//! - [`mapping`]: logical-to-physical mapping and swap insertion
//! - [`connectivity`]: direction fixing on directed couplings
//! - [`filter`], [`modifier`], [`recorder`]: small auxiliary stages

pub mod connectivity;
pub mod decomposition;
pub mod filter;
pub mod mapping;
pub mod modifier;
pub mod optimizer;
pub mod recorder;

pub use connectivity::ConnectivityEnforcer;
pub use decomposition::{
    AutoReplacer, DecompositionRule, DecompositionRuleSet, default_rule_set, default_rules,
};
pub use filter::InstructionFilter;
pub use mapping::{
    DEFAULT_FIXED_CONNECTIONS, FixedTopologyMapper, GridMapper, GridTopology, LinearMapper,
    LinearTopology, ManualMapper, Mapper, QubitMapping, RoutingMapper, Topology,
};
pub use modifier::{CommandModifier, TagRemover};
pub use optimizer::{DEFAULT_CACHE_SIZE, LocalOptimizer};
pub use recorder::{CommandRecorder, ReceivedCommands};
