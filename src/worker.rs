//! Worker threads of a generation.
//!
//! A worker lives through exactly one pass:
//! `Created -> WaitingAtStart -> Computing -> WaitingAtStop -> Terminated`.
//! It parks on the start barrier immediately after spawn, sweeps its assigned
//! line range once, arrives at the stop barrier, and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::RwLock;
use tracing::debug;

use crate::coefficients::{CoefficientSource, CoefficientTables, FIELD_COMPONENTS};
use crate::grid::GridDescriptor;
use crate::partition::LineRange;
use crate::rendezvous::RendezvousPair;

/// Raw view into the coefficient tables, shared by all workers of a pass.
///
/// The pointers reference the heap buffers of the operator-owned
/// [`CoefficientTables`]; the buffers are never resized while a generation
/// exists, so the view stays valid for the generation's lifetime.
#[derive(Clone, Copy)]
pub(crate) struct SharedTables {
    ec_c: [*mut f64; FIELD_COMPONENTS],
    ec_g: [*mut f64; FIELD_COMPONENTS],
    ec_l: [*mut f64; FIELD_COMPONENTS],
    ec_r: [*mut f64; FIELD_COMPONENTS],
    cells: usize,
}

// SAFETY: workers write pairwise-disjoint offsets (the line partition is
// disjoint by construction) strictly between the start and stop barriers,
// and the owning operator does not touch the tables while a pass is in
// flight. The barrier pair establishes the required happens-before edges.
unsafe impl Send for SharedTables {}
unsafe impl Sync for SharedTables {}

impl SharedTables {
    pub(crate) fn new(tables: &mut CoefficientTables) -> Self {
        let view = |group: &mut [Vec<f64>; FIELD_COMPONENTS]| {
            std::array::from_fn(|axis| group[axis].as_mut_ptr())
        };
        Self {
            cells: tables.cells(),
            ec_c: view(&mut tables.ec_c),
            ec_g: view(&mut tables.ec_g),
            ec_l: view(&mut tables.ec_l),
            ec_r: view(&mut tables.ec_r),
        }
    }

    /// Store one coefficient record.
    ///
    /// # Safety
    ///
    /// The caller must hold exclusive ownership of offset `ipos` for the
    /// duration of the pass, and the backing tables must still be alive.
    #[inline]
    pub(crate) unsafe fn write(&self, axis: usize, ipos: usize, ec: [f64; 4]) {
        debug_assert!(axis < FIELD_COMPONENTS);
        debug_assert!(ipos < self.cells);
        // SAFETY: in bounds per the asserts above; exclusivity is the
        // caller's contract.
        unsafe {
            self.ec_c[axis].add(ipos).write(ec[0]);
            self.ec_g[axis].add(ipos).write(ec[1]);
            self.ec_l[axis].add(ipos).write(ec[2]);
            self.ec_r[axis].add(ipos).write(ec[3]);
        }
    }
}

/// Pass inputs shared between the controller and the workers of one
/// generation.
pub(crate) struct PassShared {
    /// Grid the pass sweeps over.
    pub(crate) grid: GridDescriptor,
    /// Coefficient source slot; may be filled after the generation is
    /// spawned but must be filled before the pass is released.
    pub(crate) source: Arc<RwLock<Option<Arc<dyn CoefficientSource>>>>,
    /// Shared view into the output tables.
    pub(crate) tables: SharedTables,
    /// Set by teardown to unpark a generation whose pass never ran; a
    /// dismissed worker skips its sweep entirely.
    pub(crate) dismissed: AtomicBool,
}

/// Spawn one worker bound to its line range and the generation's barriers.
pub(crate) fn spawn_worker(
    id: usize,
    range: LineRange,
    shared: Arc<PassShared>,
    rendezvous: RendezvousPair,
) -> std::io::Result<JoinHandle<()>> {
    debug!("Spawning coefficient worker {} for lines {}", id, range);
    thread::Builder::new()
        .name(format!("ec-worker-{id}"))
        .spawn(move || worker_main(range, shared, rendezvous))
}

fn worker_main(range: LineRange, shared: Arc<PassShared>, rendezvous: RendezvousPair) {
    rendezvous.wait_start();

    if !shared.dismissed.load(Ordering::Acquire) {
        // The controller verifies the source before releasing the start
        // barrier, so the slot is filled on every non-dismissed pass.
        let source = shared.source.read().clone();
        if let Some(source) = source {
            sweep(range, &shared.grid, source.as_ref(), &shared.tables);
        }
    }

    rendezvous.wait_stop();
}

/// One computation pass over `range` and the full extent of axes 1 and 2,
/// repeated for each field-component axis.
fn sweep(
    range: LineRange,
    grid: &GridDescriptor,
    source: &dyn CoefficientSource,
    tables: &SharedTables,
) {
    let [_, ny, nz] = grid.num_lines();
    for axis in 0..FIELD_COMPONENTS {
        for x in range.lines() {
            for y in 0..ny {
                for z in 0..nz {
                    let pos = [x, y, z];
                    let ec = source.coefficients(axis, pos);
                    let ipos = grid.index(pos);
                    // SAFETY: `ipos` derives from an axis-0 line owned
                    // exclusively by this worker, so no other worker writes
                    // it during the pass.
                    unsafe { tables.write(axis, ipos, ec) };
                }
            }
        }
    }
}
