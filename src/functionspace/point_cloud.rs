//! Scattered target points.

use crate::field::{Field, FieldLocation, FieldValue};
use crate::mesh_error::MeshError;

/// Arbitrary lon/lat points; ghost points belong to another partition.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    lonlat: Vec<[f64; 2]>,
    ghost: Vec<bool>,
}

impl PointCloud {
    pub fn new(lonlat: Vec<[f64; 2]>) -> Self {
        let ghost = vec![false; lonlat.len()];
        Self { lonlat, ghost }
    }

    pub fn with_ghosts(lonlat: Vec<[f64; 2]>, ghost: Vec<bool>) -> Result<Self, MeshError> {
        if ghost.len() != lonlat.len() {
            return Err(MeshError::LengthMismatch {
                what: "point ghost flags",
                expected: lonlat.len(),
                found: ghost.len(),
            });
        }
        Ok(Self { lonlat, ghost })
    }

    pub fn len(&self) -> usize {
        self.lonlat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lonlat.is_empty()
    }

    pub fn lonlat(&self) -> &[[f64; 2]] {
        &self.lonlat
    }

    pub fn ghost(&self) -> &[bool] {
        &self.ghost
    }

    pub fn create_field<V: FieldValue>(&self, name: &str, levels: usize, variables: usize) -> Field {
        if variables == 1 {
            Field::scalar::<V>(name, FieldLocation::Points, self.len(), levels)
        } else {
            Field::vector::<V>(name, FieldLocation::Points, self.len(), levels, variables)
        }
    }
}
