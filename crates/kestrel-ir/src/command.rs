//! Commands: one gate application flowing through the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::qubit::QubitId;
use crate::tag::Tag;

/// Activation pattern of a command's controls, one bit per control qubit.
///
/// A `true` bit fires on |1>, a `false` bit on |0>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlState(Vec<bool>);

impl ControlState {
    /// All controls fire on |1>.
    pub fn all_ones(n: usize) -> Self {
        Self(vec![true; n])
    }

    /// Build from explicit bits.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    /// Parse a pattern such as `"101"`.
    pub fn parse(pattern: &str) -> IrResult<Self> {
        pattern
            .chars()
            .map(|c| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                _ => Err(IrError::InvalidControlState(pattern.to_string())),
            })
            .collect::<IrResult<Vec<_>>>()
            .map(Self)
    }

    /// The pattern bits.
    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the pattern is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any control fires on |0>.
    pub fn has_negative(&self) -> bool {
        self.0.iter().any(|bit| !bit)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in &self.0 {
            write!(f, "{}", if *bit { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// A gate applied to groups of target qubits, optionally controlled.
///
/// Control qubits are kept sorted by id with their activation bits permuted
/// alongside, so two commands built with the same controls in a different
/// order compare equal.
#[derive(Debug, Clone)]
pub struct Command {
    gate: Gate,
    qubits: Vec<Vec<QubitId>>,
    controls: Vec<QubitId>,
    control_state: ControlState,
    tags: Vec<Tag>,
}

impl Command {
    /// Create an uncontrolled command on the given target groups.
    pub fn new(gate: Gate, qubits: Vec<Vec<QubitId>>) -> Self {
        Self {
            gate,
            qubits,
            controls: vec![],
            control_state: ControlState::default(),
            tags: vec![],
        }
    }

    /// Apply `gate` to a single qubit.
    pub fn single(gate: Gate, qubit: QubitId) -> Self {
        Self::new(gate, vec![vec![qubit]])
    }

    /// Apply a two-operand gate such as `Swap`, one qubit per group.
    pub fn pair(gate: Gate, a: QubitId, b: QubitId) -> Self {
        Self::new(gate, vec![vec![a], vec![b]])
    }

    /// Apply `gate` to `target` controlled on `controls` (all firing on |1>).
    pub fn controlled(gate: Gate, controls: &[QubitId], target: QubitId) -> IrResult<Self> {
        Self::single(gate, target).with_controls(controls)
    }

    /// Controlled-not.
    pub fn cnot(control: QubitId, target: QubitId) -> Self {
        Self {
            controls: vec![control],
            control_state: ControlState::all_ones(1),
            ..Self::single(Gate::X, target)
        }
    }

    /// Controlled-Z.
    pub fn cz(control: QubitId, target: QubitId) -> Self {
        Self {
            controls: vec![control],
            control_state: ControlState::all_ones(1),
            ..Self::single(Gate::Z, target)
        }
    }

    /// Allocate `qubit`.
    pub fn allocate(qubit: QubitId) -> Self {
        Self::single(Gate::Allocate, qubit)
    }

    /// Deallocate `qubit`.
    pub fn deallocate(qubit: QubitId) -> Self {
        Self::single(Gate::Deallocate, qubit)
    }

    /// Measure `qubit`.
    pub fn measure(qubit: QubitId) -> Self {
        Self::single(Gate::Measure, qubit)
    }

    /// The flush sentinel. Carries no qubits.
    pub fn flush() -> Self {
        Self::new(Gate::Flush, vec![])
    }

    /// Add controls firing on |1>.
    pub fn with_controls(self, controls: &[QubitId]) -> IrResult<Self> {
        let state = ControlState::all_ones(controls.len());
        self.with_control_state(controls, state)
    }

    /// Add controls with an explicit activation pattern.
    pub fn with_control_state(mut self, controls: &[QubitId], state: ControlState) -> IrResult<Self> {
        if controls.len() != state.len() {
            return Err(IrError::ControlStateMismatch {
                controls: controls.len(),
                states: state.len(),
            });
        }
        if controls.is_empty() {
            return Ok(self);
        }
        if matches!(self.gate, Gate::Measure) {
            return Err(IrError::ControlledMeasurement);
        }
        self.controls.extend_from_slice(controls);
        self.control_state.0.extend_from_slice(state.bits());
        self.sort_controls();
        Ok(self)
    }

    /// Append tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Replace the gate, keeping operands and tags.
    #[must_use]
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Make every control fire on |1>.
    #[must_use]
    pub fn with_positive_controls(mut self) -> Self {
        self.control_state = ControlState::all_ones(self.controls.len());
        self
    }

    /// The gate.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Target qubit groups.
    pub fn qubits(&self) -> &[Vec<QubitId>] {
        &self.qubits
    }

    /// Control qubits, sorted by id.
    pub fn controls(&self) -> &[QubitId] {
        &self.controls
    }

    /// Activation pattern, aligned with [`Command::controls`].
    pub fn control_state(&self) -> &ControlState {
        &self.control_state
    }

    /// Tags in attachment order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Mutable access to the tags.
    pub fn tags_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.tags
    }

    /// Number of control qubits.
    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    /// Controls followed by every target qubit.
    pub fn all_qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.controls
            .iter()
            .chain(self.qubits.iter().flatten())
            .copied()
    }

    /// Total number of qubits touched.
    pub fn qubit_count(&self) -> usize {
        self.controls.len() + self.qubits.iter().map(Vec::len).sum::<usize>()
    }

    /// The first target qubit, if any.
    pub fn target(&self) -> Option<QubitId> {
        self.qubits.first().and_then(|group| group.first()).copied()
    }

    /// Whether this is the flush sentinel.
    pub fn is_flush(&self) -> bool {
        matches!(self.gate, Gate::Flush)
    }

    /// Whether any control fires on |0>.
    pub fn has_negative_controls(&self) -> bool {
        self.control_state.has_negative()
    }

    /// Whether the command is an identity gate.
    pub fn is_identity(&self) -> bool {
        self.gate.is_identity()
    }

    /// The inverse command: same operands and tags, inverted gate.
    pub fn inverse(&self) -> IrResult<Command> {
        Ok(Self {
            gate: self.gate.inverse()?,
            ..self.clone()
        })
    }

    /// Merge with a following command acting on the same operands with the
    /// same tags.
    pub fn merge(&self, other: &Command) -> IrResult<Command> {
        let same_operands = self.control_state == other.control_state
            && self.tags == other.tags
            && same_ids(&self.controls, &other.controls)
            && self.qubits.len() == other.qubits.len()
            && self
                .qubits
                .iter()
                .zip(&other.qubits)
                .all(|(a, b)| same_ids(a, b));
        if !same_operands {
            return Err(IrError::NotMergeable {
                gate: self.to_string(),
                other: other.to_string(),
            });
        }
        Ok(Self {
            gate: self.gate.merge(&other.gate)?,
            ..self.clone()
        })
    }

    /// Rewrite every qubit id through `map`. Invalid ids are left untouched.
    pub fn map_qubits<E>(
        mut self,
        mut map: impl FnMut(QubitId) -> Result<QubitId, E>,
    ) -> Result<Command, E> {
        for id in self.controls.iter_mut().chain(self.qubits.iter_mut().flatten()) {
            if id.is_valid() {
                *id = map(*id)?;
            }
        }
        self.sort_controls();
        Ok(self)
    }

    /// Drop every tag matching `predicate`.
    pub fn remove_tags(&mut self, predicate: impl Fn(&Tag) -> bool) {
        self.tags.retain(|tag| !predicate(tag));
    }

    fn sort_controls(&mut self) {
        let mut pairs: Vec<(QubitId, bool)> = self
            .controls
            .iter()
            .copied()
            .zip(self.control_state.0.iter().copied())
            .collect();
        pairs.sort_by_key(|(id, _)| *id);
        let (controls, bits): (Vec<QubitId>, Vec<bool>) = pairs.into_iter().unzip();
        self.controls = controls;
        self.control_state = ControlState(bits);
    }
}

fn same_ids(a: &[QubitId], b: &[QubitId]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_qubit(*y))
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.gate == other.gate
            && self.control_state == other.control_state
            && self.tags == other.tags
            && same_ids(&self.controls, &other.controls)
            && self.qubits.len() == other.qubits.len()
            && self
                .qubits
                .iter()
                .zip(&other.qubits)
                .all(|(a, b)| same_ids(a, b))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = |ids: &[QubitId]| -> String {
            let names: Vec<String> = ids.iter().map(QubitId::to_string).collect();
            if names.len() == 1 {
                names.join("")
            } else {
                format!("[{}]", names.join(", "))
            }
        };
        let targets: Vec<String> = self.qubits.iter().map(|g| group(g.as_slice())).collect();
        write!(f, "{}", self.gate)?;
        if !targets.is_empty() {
            if targets.len() == 1 {
                write!(f, " | {}", targets[0])?;
            } else {
                write!(f, " | ({})", targets.join(", "))?;
            }
        }
        if !self.controls.is_empty() {
            let controls: Vec<String> = self
                .controls
                .iter()
                .zip(self.control_state.bits())
                .map(|(id, on)| if *on { id.to_string() } else { format!("!{id}") })
                .collect();
            write!(f, " ctrl {}", controls.join(", "))?;
        }
        Ok(())
    }
}
