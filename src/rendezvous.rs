//! Two-phase rendezvous barrier for the worker generation.

use std::sync::{Arc, Barrier};

/// A start/stop barrier pair sized for the workers of one generation plus
/// the controller.
///
/// The controller releases a parked generation by waiting on the start
/// barrier, and observes pass completion by waiting on the stop barrier.
/// One pair is valid for exactly one release-and-rejoin pass: workers
/// terminate after arriving at the stop barrier, so a second release can
/// never be answered. The owning operator tears the pair down, with no
/// outstanding waiters, before replacing it.
#[derive(Clone)]
pub struct RendezvousPair {
    start: Arc<Barrier>,
    stop: Arc<Barrier>,
    parties: usize,
}

impl RendezvousPair {
    /// Create a barrier pair for `workers` worker threads.
    ///
    /// Each barrier waits for `workers + 1` arrivals: the workers plus the
    /// controller.
    pub fn new(workers: usize) -> Self {
        let parties = workers + 1;
        Self {
            start: Arc::new(Barrier::new(parties)),
            stop: Arc::new(Barrier::new(parties)),
            parties,
        }
    }

    /// Number of parties each barrier waits for (workers + controller).
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Block until all parties have arrived at the start barrier.
    pub fn wait_start(&self) {
        self.start.wait();
    }

    /// Block until all parties have arrived at the stop barrier.
    pub fn wait_stop(&self) {
        self.stop.wait();
    }
}

impl std::fmt::Debug for RendezvousPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousPair")
            .field("parties", &self.parties)
            .finish()
    }
}
