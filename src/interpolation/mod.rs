//! Interpolation from structured lon/lat grids to scattered points.
//!
//! A [`Kernel`] chooses the source stencil and weights for one target point;
//! [`StructuredInterpolation2D`] applies it to every target, either through an
//! assembled [`CsrMatrix`] or matrix-free. [`Interpolation`] picks the kernel
//! from [`InterpolationOptions`](crate::config::InterpolationOptions).

pub mod bilinear;
pub mod cubic;
pub mod grid;
pub mod kernel;
pub mod method;
pub mod nearest;
pub mod sparse;
pub mod structured2d;

pub use bilinear::Bilinear;
pub use cubic::Cubic;
pub use grid::{GridRow, StructuredGrid};
pub use kernel::{Kernel, KernelKind, KernelWorkspace, Stencil, Weights};
pub use method::Interpolation;
pub use nearest::Nearest;
pub use sparse::{CsrMatrix, Triplet};
pub use structured2d::StructuredInterpolation2D;
