//! Allowed gate sets for the last round of a preset.

use kestrel_ir::{Command, GateClass};
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Marker deserialized from the literal `any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnyGate {
    /// Every gate of the given width.
    Any,
}

/// Gates allowed at one width: `any` or a list of gate names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GateSelection {
    /// Everything.
    All(AnyGate),
    /// Only the listed gates.
    Only(Vec<String>),
}

impl GateSelection {
    /// Allow every gate.
    pub fn any() -> Self {
        GateSelection::All(AnyGate::Any)
    }

    /// Allow the named gates.
    pub fn only<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        GateSelection::Only(names.into_iter().map(Into::into).collect())
    }

    fn patterns(&self) -> CompileResult<Option<Vec<GatePattern>>> {
        match self {
            GateSelection::All(_) => Ok(None),
            GateSelection::Only(names) => names
                .iter()
                .map(|name| GatePattern::parse(name))
                .collect::<CompileResult<Vec<_>>>()
                .map(Some),
        }
    }
}

/// One allowed gate: a class, optionally with a fixed number of controls.
///
/// A class matches every gate whose ancestry contains it, so `rotation`
/// allows all of Rx, Ry and Rz. `cnot` and `cz` are X and Z with exactly one
/// control, `toffoli` is X with two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePattern {
    class: GateClass,
    controls: Option<usize>,
}

impl GatePattern {
    /// Parse a gate name.
    pub fn parse(name: &str) -> CompileResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CompileError::InvalidConfiguration(
                "empty gate name".to_string(),
            ));
        }
        let (class, controls) = match name.to_ascii_lowercase().as_str() {
            "cnot" | "cx" => (GateClass::X, Some(1)),
            "cz" => (GateClass::Z, Some(1)),
            "toffoli" | "ccx" => (GateClass::X, Some(2)),
            _ => (GateClass::from_name(name), None),
        };
        Ok(Self { class, controls })
    }

    /// Whether `cmd` is an instance of this pattern.
    pub fn matches(&self, cmd: &Command) -> bool {
        self.controls.is_none_or(|n| n == cmd.control_count())
            && cmd.gate().ancestry().contains(&self.class)
    }
}

/// The gate set accepted by the last filter of a preset.
///
/// Classical instructions are always allowed. One- and two-qubit patterns
/// only match commands of that width; other patterns match at any width.
#[derive(Debug, Clone, Default)]
pub struct GateSet {
    one_qubit: Option<Vec<GatePattern>>,
    two_qubit: Option<Vec<GatePattern>>,
    other: Vec<GatePattern>,
}

impl GateSet {
    /// Build from the three selections.
    pub fn new(
        one_qubit: &GateSelection,
        two_qubit: &GateSelection,
        other: &[String],
    ) -> CompileResult<Self> {
        Ok(Self {
            one_qubit: one_qubit.patterns()?,
            two_qubit: two_qubit.patterns()?,
            other: other
                .iter()
                .map(|name| GatePattern::parse(name))
                .collect::<CompileResult<_>>()?,
        })
    }

    /// Whether `cmd` belongs to the set.
    pub fn allows(&self, cmd: &Command) -> bool {
        if cmd.gate().is_classical_instruction() {
            return true;
        }
        if self.other.iter().any(|p| p.matches(cmd)) {
            return true;
        }
        let width = match cmd.qubit_count() {
            1 => &self.one_qubit,
            2 => &self.two_qubit,
            _ => return false,
        };
        match width {
            None => true,
            Some(patterns) => patterns.iter().any(|p| p.matches(cmd)),
        }
    }
}
