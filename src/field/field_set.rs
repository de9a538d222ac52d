//! FieldSet: ordered collection of uniquely named fields.

use std::collections::HashMap;

use crate::field::Field;
use crate::mesh_error::MeshError;

#[derive(Clone, Debug, Default)]
pub struct FieldSet {
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.index.clear();
    }

    /// Append a field; its name must not already be present.
    pub fn add(&mut self, field: Field) -> Result<usize, MeshError> {
        if self.index.contains_key(field.name()) {
            return Err(MeshError::DuplicateField(field.name().to_owned()));
        }
        let pos = self.fields.len();
        self.index.insert(field.name().to_owned(), pos);
        self.fields.push(field);
        Ok(pos)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_owned()).collect()
    }

    pub fn field(&self, name: &str) -> Result<&Field, MeshError> {
        self.index
            .get(name)
            .map(|&pos| &self.fields[pos])
            .ok_or_else(|| MeshError::MissingField(name.to_owned()))
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut Field, MeshError> {
        match self.index.get(name) {
            Some(&pos) => Ok(&mut self.fields[pos]),
            None => Err(MeshError::MissingField(name.to_owned())),
        }
    }

    pub fn field_at(&self, pos: usize) -> Result<&Field, MeshError> {
        self.fields
            .get(pos)
            .ok_or_else(|| MeshError::MissingField(format!("#{pos}")))
    }

    pub fn field_at_mut(&mut self, pos: usize) -> Result<&mut Field, MeshError> {
        self.fields
            .get_mut(pos)
            .ok_or_else(|| MeshError::MissingField(format!("#{pos}")))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Field> {
        self.fields.iter_mut()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a mut FieldSet {
    type Item = &'a mut Field;
    type IntoIter = std::slice::IterMut<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter_mut()
    }
}
