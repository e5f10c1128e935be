//! Multithreaded operator: generation lifecycle and the single-pass
//! handshake.
//!
//! The operator is the controller of the worker pool. One call to
//! [`MultithreadOperator::setup_generation`] creates a *generation*: a fresh
//! [`RendezvousPair`], a line partition, and one parked worker per range.
//! [`MultithreadOperator::run_pass`] consumes the generation's single pass;
//! [`MultithreadOperator::teardown`] joins the workers and releases the
//! barrier pair before a new generation may be created.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::coefficients::{CoefficientSource, CoefficientTables};
use crate::error::{OperatorError, Result};
use crate::grid::GridDescriptor;
use crate::partition::partition_lines;
use crate::rendezvous::RendezvousPair;
use crate::worker::{spawn_worker, PassShared, SharedTables};

/// Pass consumption state of a generation.
enum GenerationState {
    /// Workers are parked at the start barrier; the pass has not run.
    Armed,
    /// The single pass has been consumed; workers have terminated but are
    /// not yet joined.
    Spent,
    /// A worker failed to spawn. The under-populated barrier pair can never
    /// release the workers that did spawn, so the generation is unusable.
    Poisoned,
}

/// One worker generation: barrier pair, worker handles, and the pass inputs
/// shared with them.
struct Generation {
    rendezvous: RendezvousPair,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<PassShared>,
    state: GenerationState,
}

/// Parallel-capable FDTD operator controller.
///
/// Owns the coefficient tables, the current worker generation, and the
/// worker-count configuration. Build one with [`MultithreadOperator::new`],
/// bind the coefficient source, then call [`setup`](Self::setup) to run one
/// full generation-plus-pass cycle:
///
/// ```rust
/// # use fdtd_operator::prelude::*;
/// # use std::sync::Arc;
/// # struct S;
/// # impl CoefficientSource for S {
/// #     fn coefficients(&self, _: usize, _: [usize; 3]) -> [f64; 4] { [1.0; 4] }
/// # }
/// # fn main() -> fdtd_operator::Result<()> {
/// let mut op = MultithreadOperator::new(GridDescriptor::new([8, 4, 4])?);
/// op.set_source(Arc::new(S));
/// op.set_worker_count(2);
/// op.setup()?;
/// # Ok(())
/// # }
/// ```
pub struct MultithreadOperator {
    grid: GridDescriptor,
    tables: CoefficientTables,
    source: Arc<RwLock<Option<Arc<dyn CoefficientSource>>>>,
    worker_count: usize,
    generation: Option<Generation>,
}

impl MultithreadOperator {
    /// Create an operator bound to `grid`, with zero-filled coefficient
    /// tables and an automatic worker count.
    pub fn new(grid: GridDescriptor) -> Self {
        info!("Creating multithreaded FDTD operator for grid {}", grid);
        Self {
            tables: CoefficientTables::new(&grid),
            grid,
            source: Arc::new(RwLock::new(None)),
            worker_count: 0,
            generation: None,
        }
    }

    /// Bind the external coefficient source.
    ///
    /// May be called after [`setup_generation`](Self::setup_generation): a
    /// generation whose pass failed for lack of a source stays parked and is
    /// consumable once the source is bound.
    pub fn set_source(&mut self, source: Arc<dyn CoefficientSource>) {
        *self.source.write() = Some(source);
    }

    /// Configure the worker count. `0` means "resolve to hardware
    /// concurrency at setup time"; the resolution is repeated at every
    /// setup, so the partition may change between generations.
    pub fn set_worker_count(&mut self, count: usize) {
        self.worker_count = count;
    }

    /// Grid descriptor the operator is bound to.
    pub fn grid(&self) -> &GridDescriptor {
        &self.grid
    }

    /// Computed coefficient tables.
    ///
    /// Zero-filled until a pass has run. Sound to call at any time: workers
    /// only write strictly inside [`run_pass`](Self::run_pass), which takes
    /// `&mut self`.
    pub fn tables(&self) -> &CoefficientTables {
        &self.tables
    }

    /// Number of workers in the current generation, or 0 if none exists.
    pub fn active_workers(&self) -> usize {
        self.generation.as_ref().map_or(0, |g| g.workers.len())
    }

    /// The worker count a setup call would use right now.
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_count
        }
    }

    /// Create a fresh worker generation.
    ///
    /// Tears down any prior generation, resolves the worker count,
    /// allocates a new barrier pair sized workers + 1, partitions the outer
    /// grid axis, and spawns one worker per range. All workers park at the
    /// start barrier until [`run_pass`](Self::run_pass).
    ///
    /// A spawn failure is fatal to the generation: the error is propagated
    /// and the partially-spawned generation is poisoned.
    pub fn setup_generation(&mut self) -> Result<()> {
        self.teardown();

        let workers = self.resolved_worker_count();
        info!(
            "Multithreaded operator using {} workers over grid {}",
            workers, self.grid
        );

        let rendezvous = RendezvousPair::new(workers);
        let partition = partition_lines(self.grid.num_lines()[0], workers);
        let shared = Arc::new(PassShared {
            grid: self.grid,
            source: Arc::clone(&self.source),
            tables: SharedTables::new(&mut self.tables),
            dismissed: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(workers);
        for (id, range) in partition.into_iter().enumerate() {
            match spawn_worker(id, range, Arc::clone(&shared), rendezvous.clone()) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    error!("Worker {} failed to spawn: {}", id, err);
                    self.generation = Some(Generation {
                        rendezvous,
                        workers: handles,
                        shared,
                        state: GenerationState::Poisoned,
                    });
                    return Err(OperatorError::Spawn(err));
                }
            }
        }

        self.generation = Some(Generation {
            rendezvous,
            workers: handles,
            shared,
            state: GenerationState::Armed,
        });
        Ok(())
    }

    /// Release the current generation for its single computation pass and
    /// block until every worker has finished.
    ///
    /// Fails with [`OperatorError::Config`] if no coefficient source is
    /// bound; the barriers are not touched, no partial writes occur, and the
    /// generation stays consumable by a later, corrected call. Fails with
    /// [`OperatorError::Protocol`] if no generation exists or its pass was
    /// already consumed; workers terminate after one pass, so silently
    /// waiting would deadlock on the stop barrier forever.
    pub fn run_pass(&mut self) -> Result<()> {
        let generation = self.generation.as_mut().ok_or_else(|| {
            OperatorError::protocol("run_pass called with no generation set up")
        })?;
        match generation.state {
            GenerationState::Armed => {}
            GenerationState::Spent => {
                return Err(OperatorError::protocol(
                    "run_pass called twice against the same generation",
                ));
            }
            GenerationState::Poisoned => {
                return Err(OperatorError::protocol(
                    "generation is poisoned by a failed worker spawn",
                ));
            }
        }
        if self.source.read().is_none() {
            return Err(OperatorError::config(
                "coefficient source not bound; workers remain parked",
            ));
        }

        debug!("Releasing {} coefficient workers", generation.workers.len());
        generation.rendezvous.wait_start();
        generation.rendezvous.wait_stop();
        generation.state = GenerationState::Spent;
        debug!("Coefficient pass complete");
        Ok(())
    }

    /// One full setup cycle: create a generation and consume its pass.
    pub fn setup(&mut self) -> Result<()> {
        self.setup_generation()?;
        self.run_pass()
    }

    /// Join every worker of the current generation and release its barrier
    /// pair.
    ///
    /// Safe to call at any point of the generation lifecycle: a spent
    /// generation's workers have already terminated and join immediately;
    /// an armed generation is dismissed first, unparking its workers through
    /// a no-op pass so they can be joined.
    pub fn teardown(&mut self) {
        let Some(mut generation) = self.generation.take() else {
            return;
        };

        match generation.state {
            GenerationState::Armed => {
                warn!(
                    "Dismissing generation of {} workers whose pass never ran",
                    generation.workers.len()
                );
                generation.shared.dismissed.store(true, Ordering::Release);
                generation.rendezvous.wait_start();
                generation.rendezvous.wait_stop();
            }
            GenerationState::Spent => {}
            GenerationState::Poisoned => {
                error!(
                    "Detaching {} workers of a poisoned generation",
                    generation.workers.len()
                );
                // The under-populated barrier can never release these
                // workers; joining would block forever. They hold no table
                // references once parked, and the process reclaims them at
                // exit.
                return;
            }
        }

        for worker in generation.workers.drain(..) {
            if worker.join().is_err() {
                error!("Coefficient worker panicked during its pass");
            }
        }
    }
}

impl Drop for MultithreadOperator {
    fn drop(&mut self) {
        // Runs before the tables are dropped, so no worker can outlive the
        // buffers its shared view points into.
        self.teardown();
    }
}
