//! Mapping by a fixed function of the logical id.

use kestrel_ir::{Command, QubitId};

use super::{Mapper, QubitMapping, map_command};
use crate::engine::{Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

type LocationFn = Box<dyn Fn(QubitId) -> Option<u32>>;

/// Places every logical qubit at a location computed by a function fixed at
/// construction. Qubits are placed the first time a command mentions them.
pub struct ManualMapper {
    map: LocationFn,
    mapping: QubitMapping,
}

impl ManualMapper {
    /// Place logical qubit `q` at `map(q)`.
    pub fn new(map: impl Fn(QubitId) -> u32 + 'static) -> Self {
        Self {
            map: Box::new(move |qubit| Some(map(qubit))),
            mapping: QubitMapping::new(),
        }
    }

    /// Place every logical qubit at its own id.
    pub fn identity() -> Self {
        Self {
            map: Box::new(QubitId::index),
            mapping: QubitMapping::new(),
        }
    }

    fn place(&mut self, cmd: &Command) -> CompileResult<()> {
        for qubit in cmd.all_qubits().filter(|q| q.is_valid()) {
            if self.mapping.physical(qubit).is_some() {
                continue;
            }
            let location = (self.map)(qubit).ok_or_else(|| CompileError::UnmappedQubit {
                qubit,
                command: cmd.to_string(),
            })?;
            if let Some(holder) = self.mapping.logical(location) {
                return Err(CompileError::Unroutable {
                    command: cmd.to_string(),
                    reason: format!("location {location} already holds {holder}"),
                });
            }
            self.mapping.insert(qubit, location);
        }
        Ok(())
    }
}

impl Default for ManualMapper {
    fn default() -> Self {
        Self::identity()
    }
}

impl Engine for ManualMapper {
    fn name(&self) -> &str {
        "manual_mapper"
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            if cmd.is_flush() {
                next.send_one(cmd)?;
                self.mapping.clear();
                continue;
            }
            self.place(&cmd)?;
            next.send_one(map_command(&cmd, &self.mapping)?)?;
        }
        Ok(())
    }
}

impl Mapper for ManualMapper {
    fn current_mapping(&self) -> QubitMapping {
        self.mapping.clone()
    }

    fn set_current_mapping(&mut self, mapping: QubitMapping) {
        self.mapping = mapping;
    }
}
