//! Numerical operators on mesh function spaces.

pub mod fvm;
pub mod nabla;

pub use fvm::FvmNabla;
pub use nabla::{Nabla, NablaFactory, NablaRegistry};
