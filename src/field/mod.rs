//! Typed field storage attached to mesh entities.
//!
//! A [`Field`] is a named, entity-major buffer `[size][levels][variables]`
//! carrying a dirty flag that marks its halo values as stale. A [`FieldSet`]
//! groups fields by unique name while preserving insertion order.

pub mod field;
pub mod field_set;

pub use field::{DataType, Field, FieldData, FieldLocation, FieldShape, FieldValue, Real};
pub use field_set::FieldSet;
