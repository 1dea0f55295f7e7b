//! The driver: owns the stages and the qubit arena.

use kestrel_ir::{Command, Gate, QubitId};
use tracing::{debug, info, instrument, warn};

use crate::arena::QubitArena;
use crate::engine::{Downstream, Engine, Pipeline};
use crate::error::{CompileError, CompileResult};

/// Default maximum number of stages, backend included.
pub const DEFAULT_MAX_ENGINES: usize = 64;

/// Owns an ordered sequence of stages ending in a backend, hands out qubit
/// ids and stores measurement results.
pub struct MainEngine {
    /// Stages in order; the last one is the backend.
    engines: Vec<Box<dyn Engine>>,
    /// Qubit slots.
    arena: QubitArena,
    /// Maximum number of stages.
    max_engines: usize,
}

impl MainEngine {
    /// Start building a driver.
    pub fn builder() -> MainEngineBuilder {
        MainEngineBuilder::new()
    }

    /// A driver with no compiler stages in front of `backend`.
    pub fn with_backend(backend: impl Engine + 'static) -> Self {
        Self {
            engines: vec![Box::new(backend)],
            arena: QubitArena::new(),
            max_engines: DEFAULT_MAX_ENGINES,
        }
    }

    /// Send a batch of commands into the first stage.
    pub fn send(&mut self, commands: Vec<Command>) -> CompileResult<()> {
        Pipeline::new(&mut self.engines, &mut self.arena).send(commands)
    }

    /// Apply a command. Every valid qubit it references must be live.
    pub fn apply(&mut self, cmd: Command) -> CompileResult<()> {
        if let Some(dead) = cmd
            .all_qubits()
            .find(|id| id.is_valid() && !self.arena.is_live(*id))
        {
            return Err(CompileError::QubitNotAllocated(dead));
        }
        self.send(vec![cmd])
    }

    /// Apply `gate` with one target group per qubit in `targets`.
    pub fn apply_gate(&mut self, gate: Gate, targets: &[QubitId]) -> CompileResult<()> {
        self.apply(Command::new(gate, targets.iter().map(|q| vec![*q]).collect()))
    }

    /// Apply `gate` to `targets` controlled on `controls`.
    pub fn apply_controlled(
        &mut self,
        gate: Gate,
        controls: &[QubitId],
        targets: &[QubitId],
    ) -> CompileResult<()> {
        let cmd = Command::new(gate, targets.iter().map(|q| vec![*q]).collect())
            .with_controls(controls)?;
        self.apply(cmd)
    }

    /// Allocate a qubit and announce it to the pipeline.
    pub fn allocate_qubit(&mut self) -> CompileResult<QubitId> {
        let id = self.arena.allocate();
        if let Err(err) = self.send(vec![Command::allocate(id)]) {
            self.arena.release(id)?;
            return Err(err);
        }
        debug!(qubit = %id, "allocated");
        Ok(id)
    }

    /// Allocate `n` qubits. On failure the qubits already allocated are
    /// released again.
    pub fn allocate_qureg(&mut self, n: usize) -> CompileResult<Vec<QubitId>> {
        let mut qubits = Vec::with_capacity(n);
        for _ in 0..n {
            match self.allocate_qubit() {
                Ok(id) => qubits.push(id),
                Err(err) => {
                    // The allocation error is returned, the cleanup error logged.
                    if let Err(cleanup) = self.deallocate_all(&qubits) {
                        warn!(error = %cleanup, "releasing a partial register failed");
                    }
                    return Err(err);
                }
            }
        }
        Ok(qubits)
    }

    /// Release a qubit and announce it to the pipeline.
    ///
    /// The slot is released even when the pipeline fails.
    pub fn deallocate_qubit(&mut self, id: QubitId) -> CompileResult<()> {
        self.arena.release(id)?;
        debug!(qubit = %id, "deallocated");
        self.send(vec![Command::deallocate(id)])
    }

    /// Allocate `n` qubits for the duration of `f`.
    ///
    /// Every qubit still live when `f` returns is deallocated, whether `f`
    /// succeeded or not. An error from `f` takes precedence over an error
    /// from the cleanup.
    pub fn with_qubits<T>(
        &mut self,
        n: usize,
        f: impl FnOnce(&mut Self, &[QubitId]) -> CompileResult<T>,
    ) -> CompileResult<T> {
        let qubits = self.allocate_qureg(n)?;
        let result = f(self, &qubits);
        let cleanup = self.deallocate_all(&qubits);
        let value = result?;
        cleanup?;
        Ok(value)
    }

    /// Measure a qubit. The result is available once the backend has seen
    /// the command, typically after [`MainEngine::flush`].
    pub fn measure(&mut self, id: QubitId) -> CompileResult<()> {
        self.apply(Command::measure(id))
    }

    /// Read a stored measurement result.
    pub fn measurement_result(&self, id: QubitId) -> CompileResult<bool> {
        self.arena.measurement_result(id)
    }

    /// Push a flush through every stage, optionally deallocating every live
    /// qubit first.
    #[instrument(skip(self))]
    pub fn flush(&mut self, deallocate_qubits: bool) -> CompileResult<()> {
        if deallocate_qubits {
            let live = self.arena.live_qubits();
            self.deallocate_all(&live)?;
        }
        info!(
            "Flushing pipeline with {} engines, {} live qubits",
            self.engines.len(),
            self.arena.live_count()
        );
        self.send(vec![Command::flush()])
    }

    /// Ask the first stage whether the pipeline can run `cmd`.
    pub fn is_available(&self, cmd: &Command) -> CompileResult<bool> {
        Downstream::new(&self.engines).is_available(cmd)
    }

    /// Insert a stage at `index`. The backend stays last.
    pub fn insert_engine(&mut self, index: usize, engine: Box<dyn Engine>) -> CompileResult<()> {
        let len = self.engines.len();
        if index >= len {
            return Err(CompileError::NoSuchEngine { index, len });
        }
        if len + 1 > self.max_engines {
            return Err(CompileError::PipelineTooDeep {
                engines: len + 1,
                max: self.max_engines,
            });
        }
        self.engines.insert(index, engine);
        Ok(())
    }

    /// Remove the stage at `index`. The backend cannot be removed.
    pub fn drop_engine(&mut self, index: usize) -> CompileResult<Box<dyn Engine>> {
        let len = self.engines.len();
        if index + 1 >= len {
            return Err(CompileError::NoSuchEngine { index, len });
        }
        Ok(self.engines.remove(index))
    }

    /// Number of stages, backend included.
    pub fn num_engines(&self) -> usize {
        self.engines.len()
    }

    /// Stage names in order.
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|engine| engine.name()).collect()
    }

    /// The qubit arena.
    pub fn arena(&self) -> &QubitArena {
        &self.arena
    }

    fn deallocate_all(&mut self, qubits: &[QubitId]) -> CompileResult<()> {
        let mut first_error = None;
        for &id in qubits {
            if !self.arena.is_live(id) {
                continue;
            }
            if let Err(err) = self.deallocate_qubit(id) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for MainEngine {
    fn drop(&mut self) {
        let live = self.arena.live_count();
        if live > 0 {
            warn!(live, "main engine dropped with live qubits");
        }
    }
}

/// Builder for [`MainEngine`].
pub struct MainEngineBuilder {
    /// Compiler stages, in order.
    engines: Vec<Box<dyn Engine>>,
    /// The final stage.
    backend: Option<Box<dyn Engine>>,
    /// Maximum number of stages.
    max_engines: usize,
}

impl MainEngineBuilder {
    /// Create a new builder with no stages.
    pub fn new() -> Self {
        Self {
            engines: vec![],
            backend: None,
            max_engines: DEFAULT_MAX_ENGINES,
        }
    }

    /// Append a compiler stage.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Engine + 'static) -> Self {
        self.engines.push(Box::new(engine));
        self
    }

    /// Append a list of compiler stages, such as a preset from
    /// [`crate::setups`].
    #[must_use]
    pub fn with_engines(mut self, engines: Vec<Box<dyn Engine>>) -> Self {
        self.engines.extend(engines);
        self
    }

    /// Set the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: impl Engine + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Set the maximum number of stages, backend included.
    #[must_use]
    pub fn with_max_engines(mut self, max: usize) -> Self {
        self.max_engines = max;
        self
    }

    /// Build the driver.
    pub fn build(self) -> CompileResult<MainEngine> {
        let backend = self.backend.ok_or_else(|| {
            CompileError::InvalidConfiguration("main engine needs a backend".into())
        })?;
        let mut engines = self.engines;
        engines.push(backend);
        if engines.len() > self.max_engines {
            return Err(CompileError::PipelineTooDeep {
                engines: engines.len(),
                max: self.max_engines,
            });
        }
        Ok(MainEngine {
            engines,
            arena: QubitArena::new(),
            max_engines: self.max_engines,
        })
    }
}

impl Default for MainEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{CommandRecorder, InstructionFilter};

    /// Backend that takes two allocations and rejects every deallocation.
    struct TwoSlots {
        allocated: usize,
    }

    impl Engine for TwoSlots {
        fn name(&self) -> &str {
            "two_slots"
        }

        fn receive(&mut self, commands: Vec<Command>, _next: &mut Pipeline<'_>) -> CompileResult<()> {
            for cmd in commands {
                match cmd.gate() {
                    Gate::Allocate if self.allocated == 2 => {
                        return Err(CompileError::OverCapacity {
                            required: 3,
                            available: 2,
                        });
                    }
                    Gate::Allocate => self.allocated += 1,
                    Gate::Deallocate => {
                        return Err(CompileError::Unroutable {
                            command: cmd.to_string(),
                            reason: "deallocation rejected".into(),
                        });
                    }
                    _ => {}
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_partial_register_keeps_allocation_error() {
        let mut eng = MainEngine::with_backend(TwoSlots { allocated: 0 });
        let err = eng.allocate_qureg(3).unwrap_err();
        assert!(matches!(
            err,
            CompileError::OverCapacity {
                required: 3,
                available: 2
            }
        ));
        // Slots are released even though the pipeline rejected the
        // deallocations.
        assert_eq!(eng.arena().live_count(), 0);
    }

    #[test]
    fn test_allocate_and_flush_reach_backend() {
        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::with_backend(backend);

        let q = eng.allocate_qubit().unwrap();
        eng.apply_gate(Gate::H, &[q]).unwrap();
        eng.flush(true).unwrap();

        let gates: Vec<Gate> = received.commands().iter().map(|c| c.gate().clone()).collect();
        assert_eq!(
            gates,
            vec![Gate::Allocate, Gate::H, Gate::Deallocate, Gate::Flush]
        );
        assert_eq!(eng.arena().live_count(), 0);
    }

    #[test]
    fn test_measurement_result() {
        let backend = CommandRecorder::new().with_measurement_outcome(true);
        let mut eng = MainEngine::with_backend(backend);
        let q = eng.allocate_qubit().unwrap();
        assert!(matches!(
            eng.measurement_result(q),
            Err(CompileError::NotYetMeasured(_))
        ));
        eng.measure(q).unwrap();
        eng.flush(true).unwrap();
        assert!(eng.measurement_result(q).unwrap());
    }

    #[test]
    fn test_apply_on_released_qubit_fails() {
        let mut eng = MainEngine::with_backend(CommandRecorder::new());
        let q = eng.allocate_qubit().unwrap();
        eng.deallocate_qubit(q).unwrap();
        assert!(matches!(
            eng.apply_gate(Gate::X, &[q]),
            Err(CompileError::QubitNotAllocated(_))
        ));
        assert!(eng.deallocate_qubit(q).is_err());
    }

    #[test]
    fn test_with_qubits_deallocates_on_error() {
        let backend = CommandRecorder::new();
        let received = backend.received();
        let mut eng = MainEngine::with_backend(backend);

        let result: CompileResult<()> = eng.with_qubits(2, |eng, qubits| {
            eng.apply_gate(Gate::H, &qubits[..1])?;
            Err(CompileError::InvalidConfiguration("boom".into()))
        });
        assert!(matches!(result, Err(CompileError::InvalidConfiguration(_))));
        assert_eq!(eng.arena().live_count(), 0);
        let deallocations = received
            .commands()
            .iter()
            .filter(|c| matches!(c.gate(), Gate::Deallocate))
            .count();
        assert_eq!(deallocations, 2);
    }

    #[test]
    fn test_with_qubits_tolerates_early_release() {
        let mut eng = MainEngine::with_backend(CommandRecorder::new());
        let value = eng
            .with_qubits(2, |eng, qubits| {
                eng.deallocate_qubit(qubits[0])?;
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(eng.arena().live_count(), 0);
    }

    #[test]
    fn test_builder_requires_backend() {
        assert!(matches!(
            MainEngine::builder().build(),
            Err(CompileError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_builder_max_engines() {
        let result = MainEngine::builder()
            .with_engine(InstructionFilter::accepting(|_| true))
            .with_engine(InstructionFilter::accepting(|_| true))
            .with_backend(CommandRecorder::new())
            .with_max_engines(2)
            .build();
        assert!(matches!(
            result,
            Err(CompileError::PipelineTooDeep { engines: 3, max: 2 })
        ));
    }

    #[test]
    fn test_drop_and_insert_engine() {
        let mut eng = MainEngine::builder()
            .with_engine(InstructionFilter::accepting(|_| true))
            .with_backend(CommandRecorder::new())
            .build()
            .unwrap();
        assert_eq!(eng.engine_names(), vec!["instruction_filter", "recorder"]);

        assert!(matches!(
            eng.drop_engine(1),
            Err(CompileError::NoSuchEngine { index: 1, len: 2 })
        ));
        let dropped = eng.drop_engine(0).unwrap();
        assert_eq!(dropped.name(), "instruction_filter");
        assert_eq!(eng.num_engines(), 1);

        eng.insert_engine(0, dropped).unwrap();
        assert_eq!(eng.num_engines(), 2);
        assert!(eng.insert_engine(5, Box::new(CommandRecorder::new())).is_err());
    }

    #[test]
    fn test_is_available_asks_pipeline() {
        let eng = MainEngine::builder()
            .with_engine(InstructionFilter::accepting(|cmd| {
                matches!(cmd.gate(), Gate::H)
            }))
            .with_backend(CommandRecorder::new())
            .build()
            .unwrap();
        assert!(eng.is_available(&Command::single(Gate::H, QubitId(0))).unwrap());
        assert!(!eng.is_available(&Command::single(Gate::X, QubitId(0))).unwrap());
    }
}
