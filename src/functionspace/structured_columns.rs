//! Columns of values on the points of a structured grid.

use std::sync::Arc;

use crate::field::{Field, FieldLocation, FieldValue};
use crate::interpolation::grid::StructuredGrid;
use crate::mesh_error::MeshError;

#[derive(Clone, Debug)]
pub struct StructuredColumns {
    grid: Arc<StructuredGrid>,
    nb_partitions: usize,
}

impl StructuredColumns {
    /// Whole grid on one partition.
    pub fn new(grid: Arc<StructuredGrid>) -> Self {
        Self {
            grid,
            nb_partitions: 1,
        }
    }

    /// Grid declared as distributed over `nb_partitions`.
    pub fn distributed(grid: Arc<StructuredGrid>, nb_partitions: usize) -> Self {
        Self {
            grid,
            nb_partitions,
        }
    }

    pub fn grid(&self) -> &Arc<StructuredGrid> {
        &self.grid
    }

    pub fn nb_partitions(&self) -> usize {
        self.nb_partitions
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn create_field<V: FieldValue>(&self, name: &str, levels: usize, variables: usize) -> Field {
        if variables == 1 {
            Field::scalar::<V>(name, FieldLocation::Points, self.size(), levels)
        } else {
            Field::vector::<V>(name, FieldLocation::Points, self.size(), levels, variables)
        }
    }

    /// A single-partition grid has no halo; the field is only marked fresh.
    pub fn halo_exchange(&self, field: &mut Field) -> Result<(), MeshError> {
        field.expect_size(self.size())?;
        if self.nb_partitions > 1 {
            return Err(MeshError::NotImplemented(format!(
                "halo exchange of structured columns over {} partitions",
                self.nb_partitions
            )));
        }
        field.set_dirty(false);
        Ok(())
    }
}
