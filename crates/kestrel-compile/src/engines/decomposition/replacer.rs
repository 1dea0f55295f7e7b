//! Rule-driven gate decomposition.

use std::sync::Arc;

use kestrel_ir::Command;
use tracing::debug;

use super::rule::{DecompositionRule, DecompositionRuleSet};
use crate::engine::{Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Default bound on nested rule applications for one command.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Picks one rule out of the recognizing candidates by index.
pub type DecompositionChooser = Box<dyn Fn(&Command, &[&DecompositionRule]) -> usize>;

/// Replaces commands the downstream stages cannot run by their
/// decompositions.
///
/// For each command:
/// 1. If the next stage accepts it, it is forwarded unchanged.
/// 2. Otherwise a rule for negative control patterns is used if one
///    recognizes the command.
/// 3. Otherwise the chooser picks among the recognizing rules of the most
///    specific gate class that has any (default: the first).
/// 4. Otherwise, if the gate has an inverse with a rule, the inverse is
///    decomposed and the result reversed and inverted.
///
/// Expansions are processed with an explicit work list, so every produced
/// command goes through the same steps. Produced commands carry the original
/// command's tags followed by their own.
pub struct AutoReplacer {
    rules: Arc<DecompositionRuleSet>,
    chooser: Option<DecompositionChooser>,
    max_depth: usize,
}

impl AutoReplacer {
    /// Create a replacer over a shared rule set.
    pub fn new(rules: Arc<DecompositionRuleSet>) -> Self {
        Self {
            rules,
            chooser: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the chooser used when several rules apply.
    #[must_use]
    pub fn with_chooser(
        mut self,
        chooser: impl Fn(&Command, &[&DecompositionRule]) -> usize + 'static,
    ) -> Self {
        self.chooser = Some(Box::new(chooser));
        self
    }

    /// Set the maximum number of nested rule applications.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    fn choose<'r>(
        &self,
        cmd: &Command,
        candidates: &[&'r DecompositionRule],
    ) -> CompileResult<&'r DecompositionRule> {
        let index = self.chooser.as_ref().map_or(0, |choose| choose(cmd, candidates));
        candidates
            .get(index)
            .copied()
            .ok_or(CompileError::InvalidChoice {
                index,
                candidates: candidates.len(),
            })
    }

    fn expand(&self, rule: &DecompositionRule, cmd: &Command) -> CompileResult<Vec<Command>> {
        debug!(rule = rule.name(), command = %cmd, "decomposing");
        let produced = rule.rewrite(cmd)?;
        Ok(produced
            .into_iter()
            .map(|mut new| {
                let own = std::mem::take(new.tags_mut());
                new.with_tags(cmd.tags().iter().cloned().chain(own))
            })
            .collect())
    }

    fn decompose(&self, cmd: &Command) -> CompileResult<Vec<Command>> {
        if let Some(rule) = self.rules.negative_control_rule(cmd) {
            return self.expand(rule, cmd);
        }

        let candidates = self.rules.candidates(cmd);
        if !candidates.is_empty() {
            let rule = self.choose(cmd, &candidates)?;
            return self.expand(rule, cmd);
        }

        if let Ok(inverse) = cmd.inverse() {
            let candidates = self.rules.candidates(&inverse);
            if !candidates.is_empty() {
                let rule = self.choose(&inverse, &candidates)?;
                debug!(command = %cmd, "decomposing through inverse");
                return self
                    .expand(rule, &inverse)?
                    .into_iter()
                    .rev()
                    .map(|c| c.inverse().map_err(CompileError::from))
                    .collect();
            }
        }

        Err(CompileError::NoGateDecomposition {
            command: cmd.to_string(),
        })
    }

    fn process(&self, cmd: Command, next: &mut Pipeline<'_>) -> CompileResult<()> {
        let mut work = vec![(cmd, 0usize)];
        while let Some((cmd, depth)) = work.pop() {
            if cmd.gate().is_classical_instruction() || next.is_available(&cmd)? {
                next.send_one(cmd)?;
                continue;
            }
            if depth >= self.max_depth {
                return Err(CompileError::DecompositionTooDeep {
                    depth: self.max_depth,
                    command: cmd.to_string(),
                });
            }
            let expansion = self.decompose(&cmd)?;
            work.extend(expansion.into_iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(())
    }
}

impl Engine for AutoReplacer {
    fn name(&self) -> &str {
        "auto_replacer"
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            self.process(cmd, next)?;
        }
        Ok(())
    }
}
