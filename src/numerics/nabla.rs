//! Differential operators and an explicit registry of their implementations.

use std::collections::BTreeMap;

use crate::algs::communicator::Communicator;
use crate::config::{EDGE_BASED_FINITE_VOLUME, NablaOptions};
use crate::field::Field;
use crate::functionspace::FunctionSpace;
use crate::mesh_error::MeshError;
use crate::numerics::fvm::FvmNabla;

/// Discrete nabla operator bound to a function space.
pub trait Nabla {
    /// Horizontal gradient of a rank-0 node field into a two-component field
    /// with the same levels.
    ///
    /// `scalar` is taken mutably because its halo is refreshed when dirty.
    fn gradient(&self, scalar: &mut Field, grad: &mut Field) -> Result<(), MeshError>;
}

/// Constructs a nabla for a function space.
pub type NablaFactory<C> = fn(&FunctionSpace<C>) -> Result<Box<dyn Nabla>, MeshError>;

/// Name-keyed table of nabla factories, built by the caller and passed to
/// whoever composes operators.
pub struct NablaRegistry<C: Communicator> {
    factories: BTreeMap<String, NablaFactory<C>>,
}

impl<C: Communicator + 'static> Default for NablaRegistry<C> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn edge_based_finite_volume<C: Communicator + 'static>(
    fs: &FunctionSpace<C>,
) -> Result<Box<dyn Nabla>, MeshError> {
    Ok(Box::new(FvmNabla::new(fs)?))
}

impl<C: Communicator + 'static> NablaRegistry<C> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in operators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EDGE_BASED_FINITE_VOLUME, edge_based_finite_volume::<C>);
        registry
    }

    /// Register `factory` under `name`, returning the factory it replaces.
    pub fn register(&mut self, name: &str, factory: NablaFactory<C>) -> Option<NablaFactory<C>> {
        self.factories.insert(name.to_owned(), factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str, fs: &FunctionSpace<C>) -> Result<Box<dyn Nabla>, MeshError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MeshError::UnknownNabla(name.to_owned()))?;
        factory(fs)
    }

    pub fn create_with(&self, options: &NablaOptions, fs: &FunctionSpace<C>) -> Result<Box<dyn Nabla>, MeshError> {
        self.create(&options.kind, fs)
    }
}
