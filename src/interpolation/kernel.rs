//! Interpolation kernels: stencil selection and weight computation.
//!
//! A kernel picks a `width x width` block of source points around a target
//! (one column range per row, since reduced grids shift columns from row to
//! row) and weights them. Points handed to a kernel are already normalised
//! with [`StructuredGrid::normalise`].

use crate::field::Real;
use crate::interpolation::grid::StructuredGrid;
use crate::interpolation::sparse::Triplet;
use crate::mesh_error::MeshError;

/// Largest stencil width of any kernel.
pub const MAX_STENCIL_WIDTH: usize = 4;

/// Kernel choice for configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    #[default]
    Bilinear,
    Cubic,
    Nearest,
}

/// Source rows, and per row the source columns, of one target's stencil.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Stencil {
    pub width: usize,
    pub rows: [usize; MAX_STENCIL_WIDTH],
    pub cols: [[usize; MAX_STENCIL_WIDTH]; MAX_STENCIL_WIDTH],
}

impl Stencil {
    /// Flat source index of stencil entry `(k, m)`: row `k`, column `m`.
    #[inline]
    pub fn source_index(&self, grid: &StructuredGrid, k: usize, m: usize) -> usize {
        grid.index(self.cols[k][m], self.rows[k])
    }
}

/// Separable weights: entry `(k, m)` has weight `wy[k] * wx[k][m]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Weights {
    pub wy: [f64; MAX_STENCIL_WIDTH],
    pub wx: [[f64; MAX_STENCIL_WIDTH]; MAX_STENCIL_WIDTH],
}

impl Weights {
    #[inline]
    pub fn weight(&self, k: usize, m: usize) -> f64 {
        self.wy[k] * self.wx[k][m]
    }
}

/// Per-thread scratch space.
#[derive(Clone, Debug, Default)]
pub struct KernelWorkspace {
    pub stencil: Stencil,
    pub weights: Weights,
}

/// Lagrange basis weights of the nodes `xs` at `x`.
pub(crate) fn lagrange_weights(xs: &[f64], x: f64, out: &mut [f64]) {
    for (k, w) in out.iter_mut().enumerate().take(xs.len()) {
        *w = xs
            .iter()
            .enumerate()
            .filter(|&(m, _)| m != k)
            .map(|(_, &xm)| (x - xm) / (xs[k] - xm))
            .product();
    }
}

pub trait Kernel: Send + Sync {
    fn kind(&self) -> KernelKind;

    /// Points on either side of the target the stencil reaches.
    fn stencil_radius(&self) -> usize;

    fn stencil_width(&self) -> usize {
        (2 * self.stencil_radius()).max(1)
    }

    fn stencil_size(&self) -> usize {
        self.stencil_width() * self.stencil_width()
    }

    /// Reject grids too small for this stencil.
    fn check_grid(&self, grid: &StructuredGrid) -> Result<(), MeshError> {
        let w = self.stencil_width();
        if grid.ny() < w || grid.nx_min() < w {
            return Err(MeshError::InvalidGrid(format!(
                "{:?} kernel needs at least {w} points per direction",
                self.kind()
            )));
        }
        Ok(())
    }

    /// Triplet storage for `n` targets, one disjoint slot per target.
    fn allocate_triplets(&self, n: usize) -> Vec<Triplet> {
        vec![Triplet::default(); n * self.stencil_size()]
    }

    fn compute_stencil(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &mut Stencil);

    fn compute_weights(&self, grid: &StructuredGrid, point: [f64; 2], stencil: &Stencil, weights: &mut Weights);

    /// Fill `triplets` (this target's slot) with `(row, source, weight)` entries.
    fn insert_triplets(
        &self,
        row: usize,
        point: [f64; 2],
        grid: &StructuredGrid,
        triplets: &mut [Triplet],
        workspace: &mut KernelWorkspace,
    ) {
        self.compute_stencil(grid, point, &mut workspace.stencil);
        self.compute_weights(grid, point, &workspace.stencil, &mut workspace.weights);
        let w = workspace.stencil.width;
        for k in 0..w {
            for m in 0..w {
                triplets[k * w + m] = Triplet {
                    row,
                    col: workspace.stencil.source_index(grid, k, m),
                    value: workspace.weights.weight(k, m),
                };
            }
        }
    }

    /// Weighted sum of `source` over the stencil, for each of the `stride`
    /// values stored per point.
    fn interpolate<V: Real>(
        &self,
        grid: &StructuredGrid,
        stencil: &Stencil,
        weights: &Weights,
        source: &[V],
        stride: usize,
        target: &mut [V],
    ) where
        Self: Sized,
    {
        let w = stencil.width;
        for (q, out) in target.iter_mut().enumerate().take(stride) {
            let mut acc = 0.0f64;
            for k in 0..w {
                for m in 0..w {
                    let src = stencil.source_index(grid, k, m);
                    acc += weights.weight(k, m) * source[src * stride + q].widen();
                }
            }
            *out = V::narrow(acc);
        }
    }
}
