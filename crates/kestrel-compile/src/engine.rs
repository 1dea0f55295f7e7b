//! Pipeline stage trait and the per-call pipeline context.
//!
//! Stages do not hold references to each other or to the driver. When a
//! stage receives commands it also receives a [`Pipeline`]: the stages after
//! it plus the driver's [`QubitArena`]. Sending through the pipeline hands
//! the commands to the next stage together with a pipeline one step shorter.

use kestrel_ir::Command;
use tracing::trace;

use crate::arena::QubitArena;
use crate::error::{CompileError, CompileResult};

/// A pipeline stage.
pub trait Engine {
    /// Get the stage name, for logging.
    fn name(&self) -> &str;

    /// Whether this stage (and the stages after it) can run `cmd`.
    ///
    /// The default asks the next stage. The last stage must override this.
    fn is_available(&self, cmd: &Command, next: Downstream<'_>) -> CompileResult<bool> {
        next.is_available(cmd)
    }

    /// Consume a batch of commands, forwarding through `next`.
    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()>;
}

/// Read-only view of the stages after the current one.
#[derive(Clone, Copy)]
pub struct Downstream<'a> {
    engines: &'a [Box<dyn Engine>],
}

impl<'a> Downstream<'a> {
    /// View over `engines`.
    pub fn new(engines: &'a [Box<dyn Engine>]) -> Self {
        Self { engines }
    }

    /// Ask the next stage whether it can run `cmd`.
    pub fn is_available(&self, cmd: &Command) -> CompileResult<bool> {
        match self.engines.split_first() {
            Some((head, rest)) => head.is_available(cmd, Downstream::new(rest)),
            None => Err(CompileError::NoNextEngine),
        }
    }

    /// Number of remaining stages.
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Whether there are no further stages.
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

/// The stages after the current one plus the driver context.
pub struct Pipeline<'a> {
    engines: &'a mut [Box<dyn Engine>],
    arena: &'a mut QubitArena,
}

impl<'a> Pipeline<'a> {
    /// Pipeline over `engines` sharing `arena`.
    pub fn new(engines: &'a mut [Box<dyn Engine>], arena: &'a mut QubitArena) -> Self {
        Self { engines, arena }
    }

    /// Forward a batch to the next stage.
    pub fn send(&mut self, commands: Vec<Command>) -> CompileResult<()> {
        if commands.is_empty() {
            return Ok(());
        }
        let Some((head, rest)) = self.engines.split_first_mut() else {
            return Err(CompileError::NoNextEngine);
        };
        trace!(engine = head.name(), commands = commands.len(), "forwarding");
        let mut next = Pipeline {
            engines: rest,
            arena: &mut *self.arena,
        };
        head.receive(commands, &mut next)
    }

    /// Forward a single command.
    pub fn send_one(&mut self, cmd: Command) -> CompileResult<()> {
        self.send(vec![cmd])
    }

    /// Ask the next stage whether it can run `cmd`.
    pub fn is_available(&self, cmd: &Command) -> CompileResult<bool> {
        self.downstream().is_available(cmd)
    }

    /// Read-only view of the remaining stages.
    pub fn downstream(&self) -> Downstream<'_> {
        Downstream::new(&*self.engines)
    }

    /// The driver's qubit arena, for storing measurement results.
    pub fn arena(&mut self) -> &mut QubitArena {
        &mut *self.arena
    }

    /// Whether the current stage is the last one.
    pub fn is_last(&self) -> bool {
        self.engines.is_empty()
    }
}
