//! Windowed peephole optimization.

use std::collections::BTreeMap;

use itertools::Itertools;
use kestrel_ir::{Command, Gate, QubitId};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::engine::{Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Default number of commands buffered per qubit.
pub const DEFAULT_CACHE_SIZE: usize = 5;

type EntryId = u64;

/// What [`LocalOptimizer::optimize`] does with the entry under inspection.
enum Rewrite {
    DropIdentity,
    Cancel(EntryId),
    Merge(EntryId, Command),
    Keep,
}

/// Buffers up to `cache_size` commands per qubit and applies local
/// rewrites before forwarding:
///
/// - identity gates are removed;
/// - a command followed by its inverse on every qubit it touches cancels;
/// - a command followed by a mergeable command on the same operands is
///   replaced by the merge.
///
/// A multi-qubit command sits in the window of every qubit it touches.
/// Windows drain oldest first, and sending a multi-qubit command first
/// drains whatever precedes it on the other qubits, so the forwarded order
/// is always consistent with the received order on every qubit.
///
/// A qubit's window drains when it reaches `cache_size`, when it ends in a
/// barrier or a fast-forwarding instruction (deallocate, measure), and on
/// flush.
pub struct LocalOptimizer {
    cache_size: usize,
    windows: BTreeMap<QubitId, Vec<EntryId>>,
    entries: FxHashMap<EntryId, Command>,
    next_entry: EntryId,
}

impl LocalOptimizer {
    /// Create an optimizer holding up to `cache_size` commands per qubit.
    /// A size of zero is raised to one.
    pub fn new(cache_size: usize) -> Self {
        Self {
            cache_size: cache_size.max(1),
            windows: BTreeMap::new(),
            entries: FxHashMap::default(),
            next_entry: 0,
        }
    }

    /// The per-qubit window capacity.
    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    /// Number of buffered commands.
    pub fn buffered(&self) -> usize {
        self.entries.len()
    }

    /// Number of commands buffered for `qubit`.
    pub fn window_len(&self, qubit: QubitId) -> usize {
        self.windows.get(&qubit).map_or(0, Vec::len)
    }

    fn command(&self, id: EntryId) -> CompileResult<&Command> {
        self.entries
            .get(&id)
            .ok_or_else(|| CompileError::OptimizerInconsistent(format!("entry {id} is not buffered")))
    }

    fn entry_at(&self, qubit: QubitId, index: usize) -> Option<EntryId> {
        self.windows.get(&qubit)?.get(index).copied()
    }

    fn position(&self, qubit: QubitId, id: EntryId) -> Option<usize> {
        self.windows.get(&qubit)?.iter().position(|e| *e == id)
    }

    /// Position of entry `id` in the window of every qubit it touches.
    fn locate(&self, id: EntryId) -> CompileResult<Vec<(QubitId, usize)>> {
        self.command(id)?
            .all_qubits()
            .unique()
            .map(|qubit| {
                self.position(qubit, id)
                    .map(|pos| (qubit, pos))
                    .ok_or_else(|| {
                        CompileError::OptimizerInconsistent(format!(
                            "entry {id} missing from the window of {qubit}"
                        ))
                    })
            })
            .collect()
    }

    fn cache(&mut self, cmd: Command) {
        let id = self.next_entry;
        self.next_entry += 1;
        for qubit in cmd.all_qubits().unique() {
            self.windows.entry(qubit).or_default().push(id);
        }
        self.entries.insert(id, cmd);
    }

    fn inspect(&self, qubit: QubitId, index: usize, limit: usize) -> CompileResult<Rewrite> {
        let Some(current) = self.entry_at(qubit, index) else {
            return Ok(Rewrite::Keep);
        };
        let cmd = self.command(current)?;
        if cmd.is_identity() {
            return Ok(Rewrite::DropIdentity);
        }
        if index + 1 >= limit {
            return Ok(Rewrite::Keep);
        }
        let Some(following) = self.entry_at(qubit, index + 1) else {
            return Ok(Rewrite::Keep);
        };
        let adjacent = self
            .locate(current)?
            .into_iter()
            .all(|(q, pos)| self.entry_at(q, pos + 1) == Some(following));
        if !adjacent {
            return Ok(Rewrite::Keep);
        }
        let next = self.command(following)?;
        if cmd.inverse().is_ok_and(|inverse| inverse == *next) {
            return Ok(Rewrite::Cancel(following));
        }
        Ok(match cmd.merge(next) {
            Ok(merged) => Rewrite::Merge(following, merged),
            Err(_) => Rewrite::Keep,
        })
    }

    /// Rewrite the first `limit` entries of `qubit`'s window (all of them by
    /// default) until nothing changes. Returns the number of entries left
    /// before the limit.
    fn optimize(&mut self, qubit: QubitId, limit: Option<usize>) -> CompileResult<usize> {
        let mut limit = limit.unwrap_or_else(|| self.window_len(qubit));
        let mut index = 0;
        while index < limit {
            let Some(current) = self.entry_at(qubit, index) else {
                break;
            };
            match self.inspect(qubit, index, limit)? {
                Rewrite::Keep => {
                    index += 1;
                    continue;
                }
                Rewrite::DropIdentity => {
                    for (q, pos) in self.locate(current)? {
                        self.remove_at(q, pos, 1);
                    }
                    self.entries.remove(&current);
                    limit -= 1;
                }
                Rewrite::Cancel(following) => {
                    for (q, pos) in self.locate(current)? {
                        self.remove_at(q, pos, 2);
                    }
                    self.entries.remove(&current);
                    self.entries.remove(&following);
                    limit -= 2;
                }
                Rewrite::Merge(following, merged) => {
                    for (q, pos) in self.locate(current)? {
                        self.remove_at(q, pos + 1, 1);
                    }
                    self.entries.remove(&following);
                    self.entries.insert(current, merged);
                    limit -= 1;
                }
            }
            index = 0;
        }
        Ok(limit)
    }

    fn remove_at(&mut self, qubit: QubitId, pos: usize, count: usize) {
        if let Some(window) = self.windows.get_mut(&qubit) {
            let end = (pos + count).min(window.len());
            window.drain(pos..end);
        }
    }

    /// Forward the first `n` entries of `qubit`'s window. Before a
    /// multi-qubit entry goes out, the entries preceding it on its other
    /// qubits are optimized and forwarded.
    fn send_window(&mut self, qubit: QubitId, n: usize, next: &mut Pipeline<'_>) -> CompileResult<()> {
        let pending: Vec<EntryId> = self
            .windows
            .get(&qubit)
            .map(|w| w.iter().take(n).copied().collect())
            .unwrap_or_default();
        if pending.is_empty() {
            return Ok(());
        }
        trace!(qubit = %qubit, count = pending.len(), "draining window");

        for &id in &pending {
            let others: Vec<QubitId> = self
                .command(id)?
                .all_qubits()
                .unique()
                .filter(|q| *q != qubit)
                .collect();
            for other in others {
                let Some(pos) = self.position(other, id) else {
                    continue;
                };
                let before = self.optimize(other, Some(pos))?;
                self.send_window(other, before, next)?;
                if let Some(window) = self.windows.get_mut(&other) {
                    window.retain(|e| *e != id);
                }
            }
            let cmd = self.entries.remove(&id).ok_or_else(|| {
                CompileError::OptimizerInconsistent(format!("entry {id} was sent twice"))
            })?;
            next.send_one(cmd)?;
        }

        if let Some(window) = self.windows.get_mut(&qubit) {
            window.retain(|e| !pending.contains(e));
        }
        Ok(())
    }

    fn ends_in_drain(&self, qubit: QubitId) -> CompileResult<bool> {
        match self.windows.get(&qubit).and_then(|w| w.last()) {
            Some(id) => {
                let gate = self.command(*id)?.gate();
                Ok(gate.is_fast_forwarding() || matches!(gate, Gate::Barrier))
            }
            None => Ok(false),
        }
    }

    /// Drain every window that is full or ends in a barrier or a
    /// fast-forwarding instruction.
    fn check_and_send(&mut self, next: &mut Pipeline<'_>) -> CompileResult<()> {
        let qubits: Vec<QubitId> = self.windows.keys().copied().collect();
        for qubit in qubits {
            let full = self.window_len(qubit) >= self.cache_size;
            if !full && !self.ends_in_drain(qubit)? {
                continue;
            }
            self.optimize(qubit, None)?;
            let len = self.window_len(qubit);
            if self.ends_in_drain(qubit)? {
                self.send_window(qubit, len, next)?;
            } else if len >= self.cache_size {
                self.send_window(qubit, len - self.cache_size + 1, next)?;
            }
        }
        self.windows.retain(|_, window| !window.is_empty());
        Ok(())
    }

    fn drain_all(&mut self, next: &mut Pipeline<'_>) -> CompileResult<()> {
        let qubits: Vec<QubitId> = self.windows.keys().copied().collect();
        for qubit in qubits {
            self.optimize(qubit, None)?;
            let len = self.window_len(qubit);
            self.send_window(qubit, len, next)?;
        }
        self.windows.retain(|_, window| !window.is_empty());
        if !self.windows.is_empty() || !self.entries.is_empty() {
            return Err(CompileError::OptimizerInconsistent(format!(
                "{} commands left after flush",
                self.entries.len()
            )));
        }
        Ok(())
    }
}

impl Default for LocalOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl Engine for LocalOptimizer {
    fn name(&self) -> &str {
        "local_optimizer"
    }

    fn receive(&mut self, commands: Vec<Command>, next: &mut Pipeline<'_>) -> CompileResult<()> {
        for cmd in commands {
            if cmd.is_flush() {
                debug!(buffered = self.entries.len(), "flushing optimizer");
                self.drain_all(next)?;
                next.send_one(cmd)?;
                continue;
            }
            if cmd.all_qubits().next().is_none() {
                next.send_one(cmd)?;
                continue;
            }
            self.cache(cmd);
            self.check_and_send(next)?;
        }
        Ok(())
    }
}
