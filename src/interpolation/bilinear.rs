//! Bilinear kernel: linear in latitude between two rows, linear in longitude
//! within each row.

use crate::interpolation::grid::StructuredGrid;
use crate::interpolation::kernel::{Kernel, KernelKind, Stencil, Weights};

#[derive(Copy, Clone, Debug, Default)]
pub struct Bilinear;

impl Kernel for Bilinear {
    fn kind(&self) -> KernelKind {
        KernelKind::Bilinear
    }

    fn stencil_radius(&self) -> usize {
        1
    }

    fn compute_stencil(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &mut Stencil) {
        let (j, _) = grid.row_interval(point[1]);
        stencil.width = 2;
        for k in 0..2 {
            let row = j + k;
            let (i, _) = grid.column_interval(row, point[0]);
            stencil.rows[k] = row;
            stencil.cols[k][0] = i;
            stencil.cols[k][1] = grid.column(row, i as isize + 1);
        }
    }

    fn compute_weights(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &Stencil, weights: &mut Weights) {
        let (_, ty) = grid.row_interval(point[1]);
        weights.wy[0] = 1.0 - ty;
        weights.wy[1] = ty;
        for k in 0..2 {
            let (_, tx) = grid.column_interval(stencil.rows[k], point[0]);
            weights.wx[k][0] = 1.0 - tx;
            weights.wx[k][1] = tx;
        }
    }
}
