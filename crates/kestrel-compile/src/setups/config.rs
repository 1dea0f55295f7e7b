//! Preset configuration.
//!
//! A [`SetupConfig`] can be loaded from:
//! 1. YAML text or a YAML file
//! 2. JSON text
//! 3. Environment variables (`KESTREL_` prefix)
//!
//! Precedence, highest first: environment, file, defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::gate_set::{GateSelection, GateSet};
use crate::engines::DEFAULT_CACHE_SIZE;
use crate::engines::decomposition::DEFAULT_MAX_DEPTH;
use crate::error::{CompileError, CompileResult};

/// Overrides [`SetupConfig::cache_size`].
pub const ENV_CACHE_SIZE: &str = "KESTREL_CACHE_SIZE";

/// Overrides [`SetupConfig::max_decomposition_depth`].
pub const ENV_MAX_DECOMPOSITION_DEPTH: &str = "KESTREL_MAX_DECOMPOSITION_DEPTH";

/// Device the preset maps onto.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TopologyConfig {
    /// No mapping; only the gate set is restricted.
    #[default]
    None,
    /// A chain, or a ring when `cyclic`.
    Linear {
        /// Number of locations.
        num_qubits: u32,
        /// Whether the ends are coupled.
        #[serde(default)]
        cyclic: bool,
    },
    /// A rectangular grid.
    Grid {
        /// Number of rows.
        rows: u32,
        /// Number of columns.
        columns: u32,
        /// Preferred grid location per logical qubit id, as
        /// `[logical, location]` pairs.
        #[serde(default)]
        placement: Vec<(u32, u32)>,
    },
    /// A small device with directed couplings, searched exhaustively.
    Fixed {
        /// Directed couplings; the built-in five-location device if absent.
        #[serde(default)]
        connections: Option<Vec<(u32, u32)>>,
    },
}

/// Configuration of a preset engine list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Target device.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Allowed one-qubit gates.
    #[serde(default = "default_one_qubit_gates")]
    pub one_qubit_gates: GateSelection,
    /// Allowed two-qubit gates.
    #[serde(default = "default_two_qubit_gates")]
    pub two_qubit_gates: GateSelection,
    /// Gates allowed at any width.
    #[serde(default)]
    pub other_gates: Vec<String>,
    /// Window size of every local optimizer.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Bound on nested decompositions per command.
    #[serde(default = "default_max_decomposition_depth")]
    pub max_decomposition_depth: usize,
}

fn default_one_qubit_gates() -> GateSelection {
    GateSelection::any()
}

fn default_two_qubit_gates() -> GateSelection {
    GateSelection::only(["cnot"])
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_max_decomposition_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            one_qubit_gates: default_one_qubit_gates(),
            two_qubit_gates: default_two_qubit_gates(),
            other_gates: Vec::new(),
            cache_size: default_cache_size(),
            max_decomposition_depth: default_max_decomposition_depth(),
        }
    }
}

impl SetupConfig {
    /// Parse YAML text.
    pub fn from_yaml_str(text: &str) -> CompileResult<Self> {
        let config: SetupConfig = serde_yaml_ng::from_str(text)
            .map_err(|e| CompileError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> CompileResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CompileError::InvalidConfiguration(format!("{}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse JSON text.
    pub fn from_json_str(text: &str) -> CompileResult<Self> {
        let config: SetupConfig = serde_json::from_str(text)
            .map_err(|e| CompileError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load with the following precedence:
    /// 1. Environment variables
    /// 2. The YAML file, if given
    /// 3. Defaults
    pub fn load(path: Option<&Path>) -> CompileResult<Self> {
        let config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply the process environment on top of this configuration.
    pub fn merge_env(self) -> CompileResult<Self> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`. Only variables that are
    /// set override a value.
    pub fn merge_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> CompileResult<Self> {
        if let Some(v) = lookup(ENV_CACHE_SIZE) {
            self.cache_size = parse_env(ENV_CACHE_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_DECOMPOSITION_DEPTH) {
            self.max_decomposition_depth = parse_env(ENV_MAX_DECOMPOSITION_DEPTH, &v)?;
        }
        Ok(self)
    }

    /// Check value ranges and gate names.
    pub fn validate(&self) -> CompileResult<()> {
        if self.cache_size == 0 {
            return Err(CompileError::InvalidConfiguration(
                "cache_size must be greater than 0".to_string(),
            ));
        }
        if self.max_decomposition_depth == 0 {
            return Err(CompileError::InvalidConfiguration(
                "max_decomposition_depth must be greater than 0".to_string(),
            ));
        }
        match &self.topology {
            TopologyConfig::Linear { num_qubits: 0, .. } => {
                return Err(CompileError::InvalidConfiguration(
                    "linear topology needs at least one qubit".to_string(),
                ));
            }
            TopologyConfig::Grid { rows, columns, placement } => {
                if *rows == 0 || *columns == 0 {
                    return Err(CompileError::InvalidConfiguration(format!(
                        "invalid grid size {rows}x{columns}"
                    )));
                }
                let size = u64::from(*rows) * u64::from(*columns);
                if let Some((logical, location)) =
                    placement.iter().find(|&&(_, p)| u64::from(p) >= size)
                {
                    return Err(CompileError::InvalidConfiguration(format!(
                        "placement of qubit {logical} at {location} is outside the grid"
                    )));
                }
            }
            TopologyConfig::Fixed {
                connections: Some(connections),
            } if connections.is_empty() => {
                return Err(CompileError::InvalidConfiguration(
                    "fixed topology needs at least one connection".to_string(),
                ));
            }
            _ => {}
        }
        self.gate_set().map(|_| ())
    }

    /// The gate set of the last round.
    pub fn gate_set(&self) -> CompileResult<GateSet> {
        GateSet::new(&self.one_qubit_gates, &self.two_qubit_gates, &self.other_gates)
    }
}

fn parse_env(key: &str, value: &str) -> CompileResult<usize> {
    value.trim().parse().map_err(|_| {
        CompileError::InvalidConfiguration(format!("{key}={value} is not a non-negative integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SetupConfig::default();
        assert_eq!(config.cache_size, 5);
        assert_eq!(config.max_decomposition_depth, 64);
        assert_eq!(config.topology, TopologyConfig::None);
        assert_eq!(config.two_qubit_gates, GateSelection::only(["cnot"]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial() {
        let config = SetupConfig::from_yaml_str(
            "topology:\n  kind: linear\n  num_qubits: 4\n  cyclic: true\none_qubit_gates: [rz, h]\ncache_size: 3\n",
        )
        .unwrap();
        assert_eq!(
            config.topology,
            TopologyConfig::Linear {
                num_qubits: 4,
                cyclic: true
            }
        );
        assert_eq!(config.one_qubit_gates, GateSelection::only(["rz", "h"]));
        assert_eq!(config.cache_size, 3);
        assert_eq!(config.max_decomposition_depth, 64);
    }

    #[test]
    fn test_json_grid() {
        let config = SetupConfig::from_json_str(
            r#"{"topology": {"kind": "grid", "rows": 2, "columns": 3, "placement": [[0, 5]]}, "two_qubit_gates": "any"}"#,
        )
        .unwrap();
        match config.topology {
            TopologyConfig::Grid { placement, .. } => assert_eq!(placement, vec![(0, 5)]),
            other => panic!("unexpected topology {other:?}"),
        }
        assert_eq!(config.two_qubit_gates, GateSelection::any());
    }

    #[test]
    fn test_fixed_default_connections() {
        let config = SetupConfig::from_yaml_str("topology:\n  kind: fixed\n").unwrap();
        assert_eq!(config.topology, TopologyConfig::Fixed { connections: None });
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SetupConfig::from_yaml_str("cache_size: 0"),
            Err(CompileError::InvalidConfiguration(_))
        ));
        assert!(SetupConfig::from_yaml_str("topology:\n  kind: grid\n  rows: 0\n  columns: 2\n").is_err());
        assert!(SetupConfig::from_yaml_str(
            "topology:\n  kind: grid\n  rows: 1\n  columns: 2\n  placement: [[0, 2]]\n"
        )
        .is_err());
        assert!(SetupConfig::from_yaml_str("other_gates: ['']").is_err());
        assert!(SetupConfig::from_yaml_str("topology: {kind: torus}").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let config = SetupConfig::from_yaml_str("cache_size: 3\nmax_decomposition_depth: 10\n")
            .unwrap()
            .merge_env_from(|key| (key == ENV_CACHE_SIZE).then(|| "8".to_string()))
            .unwrap();
        assert_eq!(config.cache_size, 8);
        assert_eq!(config.max_decomposition_depth, 10);
    }

    #[test]
    fn test_env_invalid_value() {
        let result = SetupConfig::default()
            .merge_env_from(|key| (key == ENV_MAX_DECOMPOSITION_DEPTH).then(|| "deep".to_string()));
        assert!(matches!(result, Err(CompileError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_round_trip_yaml() {
        let config = SetupConfig {
            topology: TopologyConfig::Fixed {
                connections: Some(vec![(0, 1), (1, 2)]),
            },
            other_gates: vec!["barrier".to_string()],
            ..SetupConfig::default()
        };
        let text = serde_yaml_ng::to_string(&config).unwrap();
        assert_eq!(SetupConfig::from_yaml_str(&text).unwrap(), config);
    }
}
