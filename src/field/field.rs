//! Field: a named, typed buffer over mesh entities and vertical levels.

use bytemuck::Pod;
use num_traits::Float;

use crate::mesh_error::MeshError;

/// Storage precision of a field.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DataType {
    F32,
    F64,
    I32,
    I64,
}

impl DataType {
    pub fn size_of(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 => 4,
            DataType::F64 | DataType::I64 => 8,
        }
    }

    pub fn is_real(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }
}

/// Mesh entity a field is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FieldLocation {
    Nodes,
    Edges,
    /// Points of a structured grid or a target point cloud.
    Points,
}

/// Owned, typed field buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl FieldData {
    pub fn datatype(&self) -> DataType {
        match self {
            FieldData::F32(_) => DataType::F32,
            FieldData::F64(_) => DataType::F64,
            FieldData::I32(_) => DataType::I32,
            FieldData::I64(_) => DataType::I64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldData::F32(v) => v.len(),
            FieldData::F64(v) => v.len(),
            FieldData::I32(v) => v.len(),
            FieldData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element type a field buffer may hold.
pub trait FieldValue: Pod + Default + Send + Sync + 'static {
    const DATATYPE: DataType;

    fn wrap(values: Vec<Self>) -> FieldData;
    fn slice(data: &FieldData) -> Option<&[Self]>;
    fn slice_mut(data: &mut FieldData) -> Option<&mut [Self]>;
}

macro_rules! impl_field_value {
    ($ty:ty, $variant:ident) => {
        impl FieldValue for $ty {
            const DATATYPE: DataType = DataType::$variant;

            #[inline]
            fn wrap(values: Vec<Self>) -> FieldData {
                FieldData::$variant(values)
            }

            #[inline]
            fn slice(data: &FieldData) -> Option<&[Self]> {
                match data {
                    FieldData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            #[inline]
            fn slice_mut(data: &mut FieldData) -> Option<&mut [Self]> {
                match data {
                    FieldData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_field_value!(f32, F32);
impl_field_value!(f64, F64);
impl_field_value!(i32, I32);
impl_field_value!(i64, I64);

/// Floating-point field values; operators accumulate in `f64`.
pub trait Real: FieldValue + Float {
    fn widen(self) -> f64;
    fn narrow(x: f64) -> Self;
}

impl Real for f32 {
    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }
    #[inline]
    fn narrow(x: f64) -> Self {
        x as f32
    }
}

impl Real for f64 {
    #[inline]
    fn widen(self) -> f64 {
        self
    }
    #[inline]
    fn narrow(x: f64) -> Self {
        x
    }
}

/// Extent of a field: entities × levels × variables.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldShape {
    pub size: usize,
    pub levels: usize,
    pub variables: usize,
}

impl FieldShape {
    /// Values stored per entity.
    #[inline]
    pub fn stride(&self) -> usize {
        self.levels * self.variables
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size * self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named array of values over mesh entities and vertical levels.
///
/// Newly created fields are dirty: their halo has never been exchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    location: FieldLocation,
    shape: FieldShape,
    rank: usize,
    data: FieldData,
    dirty: bool,
}

impl Field {
    /// Rank-0 field with one value per entity and level.
    pub fn scalar<V: FieldValue>(
        name: impl Into<String>,
        location: FieldLocation,
        size: usize,
        levels: usize,
    ) -> Self {
        Self::zeroed::<V>(name.into(), location, size, levels, 0, 1)
    }

    /// Rank-1 field with `components` values per entity and level.
    pub fn vector<V: FieldValue>(
        name: impl Into<String>,
        location: FieldLocation,
        size: usize,
        levels: usize,
        components: usize,
    ) -> Self {
        Self::zeroed::<V>(name.into(), location, size, levels, 1, components)
    }

    /// Field of arbitrary tensor rank; `variables` is the product of its dimensions.
    ///
    /// # Errors
    /// Rank-0 fields must have exactly one variable; other ranks at least one.
    pub fn with_rank<V: FieldValue>(
        name: impl Into<String>,
        location: FieldLocation,
        size: usize,
        levels: usize,
        rank: usize,
        variables: usize,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        if (rank == 0 && variables != 1) || variables == 0 {
            return Err(MeshError::RankMismatch {
                field: name,
                expected: rank,
                variables,
                found: rank,
            });
        }
        Ok(Self::zeroed::<V>(name, location, size, levels, rank, variables))
    }

    /// Wrap existing values; `values.len()` must equal `shape.len()`.
    pub fn from_values<V: FieldValue>(
        name: impl Into<String>,
        location: FieldLocation,
        shape: FieldShape,
        rank: usize,
        values: Vec<V>,
    ) -> Result<Self, MeshError> {
        if values.len() != shape.len() {
            return Err(MeshError::LengthMismatch {
                what: "field values",
                expected: shape.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            location,
            shape,
            rank,
            data: V::wrap(values),
            dirty: true,
        })
    }

    fn zeroed<V: FieldValue>(
        name: String,
        location: FieldLocation,
        size: usize,
        levels: usize,
        rank: usize,
        variables: usize,
    ) -> Self {
        let shape = FieldShape {
            size,
            levels,
            variables,
        };
        Self {
            name,
            location,
            shape,
            rank,
            data: V::wrap(vec![V::default(); shape.len()]),
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> FieldLocation {
        self.location
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn size(&self) -> usize {
        self.shape.size
    }

    pub fn levels(&self) -> usize {
        self.shape.levels
    }

    pub fn variables(&self) -> usize {
        self.shape.variables
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn datatype(&self) -> DataType {
        self.data.datatype()
    }

    /// Halo values are stale and must be exchanged before use.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut FieldData {
        &mut self.data
    }

    /// Typed read access to the whole buffer.
    pub fn values<V: FieldValue>(&self) -> Result<&[V], MeshError> {
        V::slice(&self.data).ok_or_else(|| MeshError::DatatypeMismatch {
            field: self.name.clone(),
            expected: V::DATATYPE,
            found: self.data.datatype(),
        })
    }

    /// Typed write access to the whole buffer.
    pub fn values_mut<V: FieldValue>(&mut self) -> Result<&mut [V], MeshError> {
        let found = self.data.datatype();
        match V::slice_mut(&mut self.data) {
            Some(values) => Ok(values),
            None => Err(MeshError::DatatypeMismatch {
                field: self.name.clone(),
                expected: V::DATATYPE,
                found,
            }),
        }
    }

    /// Values of entity `idx` (`levels * variables` of them).
    pub fn entity<V: FieldValue>(&self, idx: usize) -> Result<&[V], MeshError> {
        let stride = self.shape.stride();
        let values = self.values::<V>()?;
        values
            .get(idx * stride..(idx + 1) * stride)
            .ok_or_else(|| MeshError::SizeMismatch {
                field: self.name.clone(),
                expected: idx + 1,
                found: self.shape.size,
            })
    }

    /// Fill every value with `value`.
    pub fn fill<V: FieldValue>(&mut self, value: V) -> Result<(), MeshError> {
        self.values_mut::<V>()?.fill(value);
        self.dirty = true;
        Ok(())
    }

    pub fn expect_size(&self, expected: usize) -> Result<(), MeshError> {
        if self.shape.size != expected {
            return Err(MeshError::SizeMismatch {
                field: self.name.clone(),
                expected,
                found: self.shape.size,
            });
        }
        Ok(())
    }

    pub fn expect_location(&self, expected: FieldLocation) -> Result<(), MeshError> {
        if self.location != expected {
            return Err(MeshError::LocationMismatch {
                field: self.name.clone(),
                expected,
                found: self.location,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_layout() {
        let f = Field::scalar::<f64>("t", FieldLocation::Nodes, 4, 3);
        assert_eq!(f.shape().stride(), 3);
        assert_eq!(f.values::<f64>().unwrap().len(), 12);
        assert_eq!(f.rank(), 0);
        assert!(f.is_dirty());
    }

    #[test]
    fn typed_access_checks_datatype() {
        let mut f = Field::vector::<f32>("uv", FieldLocation::Nodes, 2, 1, 2);
        assert!(f.values::<f32>().is_ok());
        assert!(matches!(
            f.values_mut::<f64>(),
            Err(MeshError::DatatypeMismatch {
                expected: DataType::F64,
                found: DataType::F32,
                ..
            })
        ));
    }

    #[test]
    fn entity_slices() {
        let shape = FieldShape {
            size: 2,
            levels: 2,
            variables: 1,
        };
        let f = Field::from_values("h", FieldLocation::Nodes, shape, 0, vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(f.entity::<f64>(1).unwrap(), &[3.0, 4.0]);
        assert!(f.entity::<f64>(2).is_err());
    }

    #[test]
    fn scalar_rank_needs_one_variable() {
        let err = Field::with_rank::<f64>("bad", FieldLocation::Nodes, 1, 1, 0, 3).unwrap_err();
        assert!(matches!(err, MeshError::RankMismatch { .. }));
        let ok = Field::with_rank::<f64>("t2", FieldLocation::Points, 1, 1, 2, 4).unwrap();
        assert_eq!(ok.rank(), 2);
    }

    #[test]
    fn from_values_checks_length() {
        let shape = FieldShape {
            size: 3,
            levels: 1,
            variables: 1,
        };
        let err = Field::from_values("x", FieldLocation::Nodes, shape, 0, vec![0i32; 2]);
        assert!(matches!(err, Err(MeshError::LengthMismatch { .. })));
    }
}
