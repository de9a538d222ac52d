//! Bicubic Lagrange kernel on a 4x4 block.
//!
//! Near the edge of a non-periodic direction the block is shifted inwards
//! rather than shrunk, so every target uses sixteen points. Latitude weights
//! use the actual row latitudes; longitude weights use the row's column
//! coordinate, which is uniform.

use crate::interpolation::grid::StructuredGrid;
use crate::interpolation::kernel::{Kernel, KernelKind, Stencil, Weights, lagrange_weights};

#[derive(Copy, Clone, Debug, Default)]
pub struct Cubic;

impl Cubic {
    fn first_row(grid: &StructuredGrid, y: f64) -> usize {
        let (j, _) = grid.row_interval(y);
        j.saturating_sub(1).min(grid.ny() - 4)
    }

    /// First column of the block as a signed offset; periodic rows may start
    /// at `-1`.
    fn first_column(grid: &StructuredGrid, row: usize, x: f64) -> isize {
        let (i, _) = grid.column_interval(row, x);
        if grid.is_periodic() {
            i as isize - 1
        } else {
            i.saturating_sub(1).min(grid.nx(row) - 4) as isize
        }
    }
}

impl Kernel for Cubic {
    fn kind(&self) -> KernelKind {
        KernelKind::Cubic
    }

    fn stencil_radius(&self) -> usize {
        2
    }

    fn compute_stencil(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &mut Stencil) {
        let j0 = Self::first_row(grid, point[1]);
        stencil.width = 4;
        for k in 0..4 {
            let row = j0 + k;
            let i0 = Self::first_column(grid, row, point[0]);
            stencil.rows[k] = row;
            for m in 0..4 {
                stencil.cols[k][m] = grid.column(row, i0 + m as isize);
            }
        }
    }

    fn compute_weights(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &Stencil, weights: &mut Weights) {
        let ys = stencil.rows.map(|row| grid.y(row));
        lagrange_weights(&ys, point[1], &mut weights.wy);
        for k in 0..4 {
            let row = stencil.rows[k];
            let i0 = Self::first_column(grid, row, point[0]);
            let xs = [0.0, 1.0, 2.0, 3.0].map(|m| i0 as f64 + m);
            let u = grid.column_coordinate(row, point[0]);
            lagrange_weights(&xs, u, &mut weights.wx[k]);
        }
    }
}
