//! Structured 3D grid descriptor.
//!
//! The descriptor maps grid positions to linear offsets into the flat
//! coefficient tables. Layout is z-major (axis 2 varies slowest):
//! `index = z * (nx * ny) + y * nx + x`.

use crate::error::{OperatorError, Result};

/// Descriptor of a structured 3D grid.
///
/// Immutable for the lifetime of a worker generation. The offset mapping is
/// deterministic and bijective over valid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDescriptor {
    num_lines: [usize; 3],
    slice_size: usize,
}

impl GridDescriptor {
    /// Create a grid descriptor from the number of mesh lines per axis.
    ///
    /// All three extents must be at least 1.
    pub fn new(num_lines: [usize; 3]) -> Result<Self> {
        if num_lines.iter().any(|&n| n == 0) {
            return Err(OperatorError::config(format!(
                "invalid grid dimensions {:?}: all extents must be >= 1",
                num_lines
            )));
        }
        Ok(Self {
            num_lines,
            slice_size: num_lines[0] * num_lines[1],
        })
    }

    /// Number of mesh lines along each axis.
    pub fn num_lines(&self) -> [usize; 3] {
        self.num_lines
    }

    /// Total number of grid cells.
    pub fn total_cells(&self) -> usize {
        self.slice_size * self.num_lines[2]
    }

    /// Convert a grid position to its linear offset.
    #[inline]
    pub fn index(&self, pos: [usize; 3]) -> usize {
        pos[2] * self.slice_size + pos[1] * self.num_lines[0] + pos[0]
    }

    /// Convert a linear offset back to a grid position.
    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let z = idx / self.slice_size;
        let remainder = idx % self.slice_size;
        let y = remainder / self.num_lines[0];
        let x = remainder % self.num_lines[0];
        [x, y, z]
    }

    /// Check whether a position lies within grid bounds.
    #[inline]
    pub fn in_bounds(&self, pos: [usize; 3]) -> bool {
        pos[0] < self.num_lines[0] && pos[1] < self.num_lines[1] && pos[2] < self.num_lines[2]
    }
}

impl std::fmt::Display for GridDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.num_lines[0], self.num_lines[1], self.num_lines[2]
        )
    }
}
