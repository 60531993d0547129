//! Record schema registry.
//!
//! A [`Schema`] maps record type names to their field definitions. It is
//! built once with [`SchemaBuilder`] and shared by every request, so field
//! paths are resolved against it instead of inspecting records at runtime.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

/// Name of a field within a record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldName(String);

impl FieldName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FieldName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Name of a registered record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Declared type of a record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `true` / `false`.
    Boolean,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Real,
    /// Exact decimal (money, quantities).
    Decimal,
    /// UTF-8 text. The only type string operators accept.
    Text,
    /// Date and time of day in local time.
    DateTime,
    /// Nested record of another registered type.
    Record(TypeName),
}

impl DataType {
    /// Returns true for types that support `sum` and `average`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Real | DataType::Decimal)
    }

    /// Returns true for types that support ordering (`min`, `max`, `lt`, ...).
    pub fn is_ordered(&self) -> bool {
        !matches!(self, DataType::Record(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Text)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => f.write_str("Boolean"),
            DataType::Integer => f.write_str("Integer"),
            DataType::Real => f.write_str("Real"),
            DataType::Decimal => f.write_str("Decimal"),
            DataType::Text => f.write_str("Text"),
            DataType::DateTime => f.write_str("DateTime"),
            DataType::Record(name) => write!(f, "{name}"),
        }
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: FieldName,
    pub data_type: DataType,
    pub nullable: bool,
}

impl FieldDef {
    /// Creates a nullable field.
    pub fn new(name: impl Into<FieldName>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Marks the field as never null.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Definition of a record type: an ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub name: TypeName,
    pub fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn new(name: impl Into<TypeName>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Finds a field by name, returning its position and definition.
    pub fn find_field(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name.as_str() == name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Registry of record types.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    records: HashMap<TypeName, Arc<RecordType>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a record type by name.
    pub fn get(&self, name: &TypeName) -> Option<&Arc<RecordType>> {
        self.records.get(name)
    }

    /// Looks up a record type by name, failing if it is not registered.
    pub fn record_type(&self, name: &str) -> Result<&Arc<RecordType>> {
        self.records
            .get(&TypeName::from(name))
            .ok_or_else(|| QueryError::RecordTypeNotFound(name.to_string()))
    }

    /// Registers a record type, replacing any previous definition.
    pub fn add(&mut self, record: RecordType) {
        self.records.insert(record.name.clone(), Arc::new(record));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fluent builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record type with the given fields.
    pub fn record(mut self, name: impl Into<TypeName>, fields: Vec<FieldDef>) -> Self {
        self.schema.add(RecordType::new(name, fields));
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}
