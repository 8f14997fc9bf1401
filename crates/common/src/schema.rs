use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MAX_VARCHAR_LENGTH: u32 = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int64,
    Float,
    Double,
    VarChar { max_length: u32 },
    FloatVector { dim: usize },
}

impl DataType {
    pub fn is_vector(&self) -> bool {
        matches!(self, DataType::FloatVector { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub data_type: DataType,
    pub is_primary: bool,
    pub description: String,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary: false,
            description: String::new(),
        }
    }

    /// An `Int64` primary-key field.
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Int64).primary()
    }

    pub fn float_vector(name: impl Into<String>, dim: usize) -> Self {
        Self::new(name, DataType::FloatVector { dim })
    }

    pub fn varchar(name: impl Into<String>, max_length: u32) -> Self {
        Self::new(name, DataType::VarChar { max_length })
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn dim(&self) -> Option<usize> {
        match self.data_type {
            DataType::FloatVector { dim } => Some(dim),
            _ => None,
        }
    }
}

/// Ordered field list describing a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub fields: Vec<FieldSchema>,
    pub description: String,
}

impl CollectionSchema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self {
            fields,
            description: String::new(),
        }
    }

    /// `id` (Int64 primary key) plus a `vector` field of the given dimension.
    pub fn for_embeddings(dim: usize) -> Self {
        Self::new(vec![
            FieldSchema::primary_key("id"),
            FieldSchema::float_vector("vector", dim),
        ])
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.is_primary)
    }

    pub fn vector_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.data_type.is_vector())
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.fields.is_empty() {
            return Err(StoreError::InvalidSchema("schema has no fields".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(StoreError::InvalidSchema("field name is empty".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(StoreError::InvalidSchema(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
            match field.data_type {
                DataType::FloatVector { dim: 0 } => {
                    return Err(StoreError::InvalidSchema(format!(
                        "vector field '{}' has dimension 0",
                        field.name
                    )));
                }
                DataType::VarChar { max_length } if max_length == 0 || max_length > MAX_VARCHAR_LENGTH => {
                    return Err(StoreError::InvalidSchema(format!(
                        "varchar field '{}' max_length must be in 1..={}",
                        field.name, MAX_VARCHAR_LENGTH
                    )));
                }
                _ => {}
            }
        }

        let primaries: Vec<_> = self.fields.iter().filter(|f| f.is_primary).collect();
        match primaries.as_slice() {
            [] => return Err(StoreError::InvalidSchema("no primary key field".to_string())),
            [pk] if pk.data_type != DataType::Int64 => {
                return Err(StoreError::InvalidSchema(format!(
                    "primary key '{}' must be Int64",
                    pk.name
                )));
            }
            [_] => {}
            _ => {
                return Err(StoreError::InvalidSchema(
                    "more than one primary key field".to_string(),
                ))
            }
        }

        if self.vector_fields().next().is_none() {
            return Err(StoreError::InvalidSchema("no vector field".to_string()));
        }

        Ok(())
    }
}
