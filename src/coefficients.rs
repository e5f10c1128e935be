//! Coefficient source interface and output tables.
//!
//! The coefficient formula itself is an external collaborator: anything that
//! can map an (axis, position) pair to the four material coefficients. The
//! operator only owns the tables the results land in and the sweep that
//! fills them.

use crate::grid::GridDescriptor;

/// Number of field-component axes a pass sweeps over.
pub const FIELD_COMPONENTS: usize = 3;

/// External provider of per-cell material coefficients.
///
/// `coefficients` must be a pure function of its arguments: it is called
/// concurrently from all worker threads, and the parallel pass is only
/// bit-identical to the sequential reference if repeated calls with the same
/// arguments return the same values.
pub trait CoefficientSource: Send + Sync {
    /// Compute the (C, G, L, R) coefficients for one field-component axis at
    /// one grid position.
    fn coefficients(&self, axis: usize, pos: [usize; 3]) -> [f64; 4];
}

/// Flat per-axis output tables for the four coefficient kinds.
///
/// Each table is indexed by the linear offset of [`GridDescriptor::index`]
/// and sized to the full grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTables {
    /// Capacitance-like coefficients, one table per field-component axis.
    pub ec_c: [Vec<f64>; FIELD_COMPONENTS],
    /// Conductance-like coefficients.
    pub ec_g: [Vec<f64>; FIELD_COMPONENTS],
    /// Loss coefficients.
    pub ec_l: [Vec<f64>; FIELD_COMPONENTS],
    /// Resistance-like coefficients.
    pub ec_r: [Vec<f64>; FIELD_COMPONENTS],
}

impl CoefficientTables {
    /// Allocate zero-filled tables covering the whole grid.
    pub fn new(grid: &GridDescriptor) -> Self {
        let cells = grid.total_cells();
        Self {
            ec_c: std::array::from_fn(|_| vec![0.0; cells]),
            ec_g: std::array::from_fn(|_| vec![0.0; cells]),
            ec_l: std::array::from_fn(|_| vec![0.0; cells]),
            ec_r: std::array::from_fn(|_| vec![0.0; cells]),
        }
    }

    /// Number of cells each table covers.
    pub fn cells(&self) -> usize {
        self.ec_c[0].len()
    }

    /// Store one coefficient record.
    #[inline]
    pub fn set(&mut self, axis: usize, ipos: usize, ec: [f64; 4]) {
        self.ec_c[axis][ipos] = ec[0];
        self.ec_g[axis][ipos] = ec[1];
        self.ec_l[axis][ipos] = ec[2];
        self.ec_r[axis][ipos] = ec[3];
    }

    /// Whether every entry of every table is still zero.
    pub fn is_zeroed(&self) -> bool {
        let zeroed = |tables: &[Vec<f64>; FIELD_COMPONENTS]| {
            tables.iter().all(|t| t.iter().all(|&v| v == 0.0))
        };
        zeroed(&self.ec_c) && zeroed(&self.ec_g) && zeroed(&self.ec_l) && zeroed(&self.ec_r)
    }
}

/// Single-threaded reference pass.
///
/// Sweeps the full grid for every field-component axis and fills `tables`.
/// The parallel pass produces tables bit-identical to this one for any
/// deterministic [`CoefficientSource`].
pub fn compute_sequential(
    grid: &GridDescriptor,
    source: &dyn CoefficientSource,
    tables: &mut CoefficientTables,
) {
    let [nx, ny, nz] = grid.num_lines();
    for axis in 0..FIELD_COMPONENTS {
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    let pos = [x, y, z];
                    let ec = source.coefficients(axis, pos);
                    tables.set(axis, grid.index(pos), ec);
                }
            }
        }
    }
}
