//! # FDTD Operator
//!
//! Barrier-synchronized multithreaded precomputation of per-cell
//! electromagnetic coefficients for an FDTD field-solver operator.
//!
//! The expensive part of operator setup is evaluating the four material
//! coefficients (C, G, L, R) for every cell of a structured 3D grid, once per
//! field-component axis. This crate parallelizes that pass across OS worker
//! threads:
//!
//! - [`partition::partition_lines`] splits the outer grid axis into
//!   contiguous, disjoint line ranges, one per worker
//! - [`rendezvous::RendezvousPair`] is the two-phase barrier (start, stop)
//!   that releases all workers at once and rejoins them deterministically
//! - [`operator::MultithreadOperator`] owns the generation lifecycle:
//!   partition, spawn, single-pass handshake, teardown
//!
//! Workers write into shared output tables without locks. This is safe
//! because the line partition is a partition in the mathematical sense: the
//! offset sets written by distinct workers never intersect, and the barrier
//! pair orders every write strictly between the controller's release and its
//! rejoin.
//!
//! # Example
//!
//! ```rust
//! use fdtd_operator::prelude::*;
//!
//! struct Vacuum;
//!
//! impl CoefficientSource for Vacuum {
//!     fn coefficients(&self, axis: usize, pos: [usize; 3]) -> [f64; 4] {
//!         let scale = (axis + 1) as f64;
//!         [scale * pos[0] as f64, 0.0, scale, 0.0]
//!     }
//! }
//!
//! # fn main() -> fdtd_operator::Result<()> {
//! let grid = GridDescriptor::new([16, 8, 8])?;
//! let mut op = MultithreadOperator::new(grid);
//! op.set_source(std::sync::Arc::new(Vacuum));
//! op.set_worker_count(0); // 0 = hardware concurrency
//! op.setup()?;
//!
//! let ipos = grid.index([3, 1, 1]);
//! assert_eq!(op.tables().ec_c[0][ipos], 3.0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod coefficients;
pub mod error;
pub mod grid;
pub mod operator;
pub mod partition;
pub mod rendezvous;

mod worker;

pub use error::{OperatorError, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::coefficients::{
        compute_sequential, CoefficientSource, CoefficientTables, FIELD_COMPONENTS,
    };
    pub use crate::error::{OperatorError, Result};
    pub use crate::grid::GridDescriptor;
    pub use crate::operator::MultithreadOperator;
    pub use crate::partition::{partition_lines, LineRange};
    pub use crate::rendezvous::RendezvousPair;
}
