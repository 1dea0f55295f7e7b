//! Stages that rewrite commands in place.

use kestrel_ir::{Command, Tag};

use crate::engine::{Engine, Pipeline};
use crate::error::CompileResult;

/// Applies a function to every command before forwarding it.
pub struct CommandModifier {
    modify: Box<dyn Fn(Command) -> Command>,
}

impl CommandModifier {
    /// Create a modifier from `modify`.
    pub fn new(modify: impl Fn(Command) -> Command + 'static) -> Self {
        Self {
            modify: Box::new(modify),
        }
    }
}

impl Engine for CommandModifier {
    fn name(&self) -> &str {
        "command_modifier"
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        let modified = commands.into_iter().map(|cmd| (self.modify)(cmd)).collect();
        next.send(modified)
    }
}

/// Strips tags from every command.
///
/// By default removes the compute and uncompute markers left by
/// decompositions, so later stages can cancel and merge across them.
pub struct TagRemover {
    remove: Vec<Tag>,
}

impl TagRemover {
    /// Remove the compute and uncompute markers.
    pub fn new() -> Self {
        Self {
            remove: vec![Tag::Compute, Tag::Uncompute],
        }
    }

    /// Remove exactly the given tags.
    pub fn with_tags(tags: Vec<Tag>) -> Self {
        Self { remove: tags }
    }
}

impl Default for TagRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TagRemover {
    fn name(&self) -> &str {
        "tag_remover"
    }

    fn receive(&mut self, mut commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in &mut commands {
            cmd.remove_tags(|tag| self.remove.contains(tag));
        }
        next.send(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::CommandRecorder;
    use crate::main_engine::MainEngine;
    use kestrel_ir::Gate;

    #[test]
    fn test_tag_remover_strips_compute_markers() {
        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::builder()
            .with_engine(TagRemover::new())
            .with_backend(backend)
            .build()
            .unwrap();
        let q = eng.allocate_qubit().unwrap();
        let cmd = Command::single(Gate::H, q).with_tags([
            Tag::Compute,
            Tag::Custom("keep".into()),
            Tag::Uncompute,
        ]);
        eng.apply(cmd).unwrap();
        eng.flush(true).unwrap();

        let commands = received.commands();
        assert_eq!(commands[1].tags(), &[Tag::Custom("keep".into())]);
    }

    #[test]
    fn test_command_modifier() {
        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::builder()
            .with_engine(CommandModifier::new(|cmd| cmd.with_tags([Tag::Dirty])))
            .with_backend(backend)
            .build()
            .unwrap();
        let q = eng.allocate_qubit().unwrap();
        eng.apply_gate(Gate::X, &[q]).unwrap();
        eng.flush(true).unwrap();
        assert!(received.commands().iter().all(|c| c.tags() == [Tag::Dirty]));
    }
}
