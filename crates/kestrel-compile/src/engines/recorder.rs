//! A backend that records what it receives.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use kestrel_ir::{Command, Gate, Tag};

use crate::engine::{Downstream, Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Shared handle to the commands a [`CommandRecorder`] has received.
#[derive(Debug, Clone, Default)]
pub struct ReceivedCommands(Rc<RefCell<Vec<Command>>>);

impl ReceivedCommands {
    /// Borrow the recorded commands.
    pub fn commands(&self) -> Ref<'_, Vec<Command>> {
        self.0.borrow()
    }

    /// Copy of the recorded commands.
    pub fn snapshot(&self) -> Vec<Command> {
        self.0.borrow().clone()
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, cmd: Command) {
        self.0.borrow_mut().push(cmd);
    }
}

/// Last stage of a pipeline that stores every command it receives.
///
/// Accepts every command unless built with [`CommandRecorder::accepting`].
/// Classical instructions are always accepted. Receiving a command it does
/// not accept is an error.
#[derive(Default)]
pub struct CommandRecorder {
    received: ReceivedCommands,
    accept: Option<Box<dyn Fn(&Command) -> bool>>,
    measurement_outcome: Option<bool>,
}

impl CommandRecorder {
    /// A recorder that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that only accepts commands matching `predicate`.
    pub fn accepting(predicate: impl Fn(&Command) -> bool + 'static) -> Self {
        Self {
            accept: Some(Box::new(predicate)),
            ..Self::default()
        }
    }

    /// Report `outcome` for every measurement, stored under the logical id.
    #[must_use]
    pub fn with_measurement_outcome(mut self, outcome: bool) -> Self {
        self.measurement_outcome = Some(outcome);
        self
    }

    /// Handle to the recorded commands.
    pub fn received(&self) -> ReceivedCommands {
        self.received.clone()
    }

    fn accepts(&self, cmd: &Command) -> bool {
        cmd.gate().is_classical_instruction() || self.accept.as_ref().is_none_or(|f| f(cmd))
    }
}

impl Engine for CommandRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn is_available(&self, cmd: &Command, _next: Downstream<'_>) -> CompileResult<bool> {
        Ok(self.accepts(cmd))
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            if !self.accepts(&cmd) {
                return Err(CompileError::UnsupportedCommand {
                    command: cmd.to_string(),
                });
            }
            if let (Gate::Measure, Some(outcome)) = (cmd.gate(), self.measurement_outcome) {
                let logical = cmd
                    .tags()
                    .iter()
                    .find_map(|tag| match tag {
                        Tag::LogicalQubitId(id) => Some(*id),
                        _ => None,
                    })
                    .or_else(|| cmd.target());
                if let Some(id) = logical {
                    next.arena().set_measurement_result(id, outcome)?;
                }
            }
            self.received.push(cmd);
        }
        Ok(())
    }
}
