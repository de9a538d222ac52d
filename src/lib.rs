//! # globe-mesh
//!
//! globe-mesh provides the distributed mesh layer of a spherical atmosphere
//! or ocean model: unstructured lon/lat meshes partitioned across ranks, halo
//! exchange of ghost values, an edge-based finite-volume gradient on the
//! median dual mesh, and interpolation from structured grids to scattered
//! points.
//!
//! ## Features
//! - Edge topology and median-dual geometry derived once per mesh, with pole
//!   edges closing the polar rings of global meshes
//! - Ownership-aware halo exchange over pluggable communicators (serial,
//!   in-process threads, MPI)
//! - Gradient operator `(∂f/∂λ, ∂f/∂φ) / (R² cos φ)` for `f32` and `f64` fields
//! - Bilinear, bicubic and nearest-neighbour interpolation, with stored
//!   sparse weights or matrix-free
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! globe-mesh = "0.3"
//! # features = ["mpi-support"]
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use globe_mesh::prelude::*;
//!
//! # fn main() -> Result<(), MeshError> {
//! let mesh = Arc::new(LonLatQuads::regular_global(72, 36).generate()?);
//! let fvm: FunctionSpace<NoComm> =
//!     EdgeBasedFiniteVolume::new(mesh, NoComm, &FvmOptions::default())?.into();
//! let nabla = NablaRegistry::default().create(EDGE_BASED_FINITE_VOLUME, &fvm)?;
//! # Ok(())
//! # }
//! ```
//!
//! Logging goes through the `log` facade; install any logger to see setup
//! summaries and geometric warnings.

pub mod algs;
pub mod config;
pub mod field;
pub mod functionspace;
pub mod interpolation;
pub mod mesh;
pub mod mesh_error;
pub mod numerics;
pub mod topology;
pub mod util;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, ExchangeTags, NoComm, RayonComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::halo_exchange::HaloExchange;
    pub use crate::algs::load_balance::LoadBalanceReport;
    pub use crate::algs::meshgen::LonLatQuads;
    pub use crate::config::{EDGE_BASED_FINITE_VOLUME, FvmOptions, InterpolationOptions, NablaOptions};
    pub use crate::field::{DataType, Field, FieldLocation, FieldSet};
    pub use crate::functionspace::{
        EdgeBasedFiniteVolume, FunctionSpace, NodeColumns, PointCloud, StructuredColumns,
    };
    pub use crate::interpolation::{Interpolation, KernelKind, StructuredGrid};
    pub use crate::mesh::{Cells, Domain, Mesh, Nodes};
    pub use crate::mesh_error::{ErrorKind, MeshError};
    pub use crate::numerics::{Nabla, NablaRegistry};
    pub use crate::topology::{GlobalId, Ownership};
    pub use crate::util::Earth;
}
