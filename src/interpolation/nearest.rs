//! Nearest-neighbour kernel: copies the closest grid point, measured
//! separately in the row and column directions.

use crate::interpolation::grid::StructuredGrid;
use crate::interpolation::kernel::{Kernel, KernelKind, Stencil, Weights};

#[derive(Copy, Clone, Debug, Default)]
pub struct Nearest;

impl Kernel for Nearest {
    fn kind(&self) -> KernelKind {
        KernelKind::Nearest
    }

    fn stencil_radius(&self) -> usize {
        0
    }

    fn compute_stencil(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &mut Stencil) {
        let row = if grid.ny() < 2 {
            0
        } else {
            let (j, ty) = grid.row_interval(point[1]);
            if ty >= 0.5 { j + 1 } else { j }
        };
        let u = grid.column_coordinate(row, point[0]);
        stencil.width = 1;
        stencil.rows[0] = row;
        stencil.cols[0][0] = grid.column(row, u.round() as isize);
    }

    fn compute_weights(&self, _: &StructuredGrid, _: [f64; 2], _: &Stencil, weights: &mut Weights) {
        weights.wy[0] = 1.0;
        weights.wx[0][0] = 1.0;
    }
}
