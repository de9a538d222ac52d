//! Small geometric helpers shared by the mesh and interpolation layers.

pub mod earth;

pub use earth::Earth;
