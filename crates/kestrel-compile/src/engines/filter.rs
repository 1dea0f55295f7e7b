//! Availability filter stage.

use kestrel_ir::Command;

use crate::engine::{Downstream, Engine, Pipeline};
use crate::error::CompileResult;

type FilterFn = Box<dyn Fn(&Command, Downstream<'_>) -> CompileResult<bool>>;

/// Decides availability with a predicate and forwards everything it
/// receives unchanged.
///
/// The predicate sees the downstream view so it can defer to later stages.
/// Classical instructions are always available.
pub struct InstructionFilter {
    filter: FilterFn,
}

impl InstructionFilter {
    /// Filter with full access to the downstream view.
    pub fn new(
        filter: impl Fn(&Command, Downstream<'_>) -> CompileResult<bool> + 'static,
    ) -> Self {
        Self {
            filter: Box::new(filter),
        }
    }

    /// Filter on the command alone.
    pub fn accepting(predicate: impl Fn(&Command) -> bool + 'static) -> Self {
        Self::new(move |cmd, _| Ok(predicate(cmd)))
    }
}

impl Engine for InstructionFilter {
    fn name(&self) -> &str {
        "instruction_filter"
    }

    fn is_available(&self, cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
        if cmd.gate().is_classical_instruction() {
            return Ok(true);
        }
        (self.filter)(cmd, next)
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        next.send(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::CommandRecorder;
    use crate::main_engine::MainEngine;
    use kestrel_ir::{Gate, QubitId};

    #[test]
    fn test_filter_engine() {
        let filter = InstructionFilter::accepting(|cmd| matches!(cmd.gate(), Gate::H));
        let eng = MainEngine::builder()
            .with_engine(filter)
            .with_backend(CommandRecorder::new())
            .build()
            .unwrap();
        let h = Command::single(Gate::H, QubitId(0));
        let x = Command::single(Gate::X, QubitId(0));
        assert!(eng.is_available(&h).unwrap());
        assert!(!eng.is_available(&x).unwrap());
        assert!(eng.is_available(&Command::measure(QubitId(0))).unwrap());
    }

    #[test]
    fn test_filter_can_defer_downstream() {
        let filter = InstructionFilter::new(|cmd, next| {
            Ok(cmd.qubit_count() <= 1 || next.is_available(cmd)?)
        });
        let eng = MainEngine::builder()
            .with_engine(filter)
            .with_backend(CommandRecorder::accepting(|cmd| cmd.control_count() == 0))
            .build()
            .unwrap();
        assert!(eng.is_available(&Command::single(Gate::X, QubitId(0))).unwrap());
        assert!(!eng.is_available(&Command::cnot(QubitId(0), QubitId(1))).unwrap());
        assert!(eng.is_available(&Command::pair(Gate::Swap, QubitId(0), QubitId(1))).unwrap());
    }
}
