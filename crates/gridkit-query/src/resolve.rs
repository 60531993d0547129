//! Field path resolution.
//!
//! A dotted path such as `Company.Name` is resolved once against the schema
//! into a [`FieldAccessor`]: a list of field positions plus the type of the
//! final field. Records are then read without any name lookups.

use std::fmt::{self, Display};

use crate::error::{QueryError, Result};
use crate::record::Record;
use crate::schema::{DataType, RecordType, Schema};
use crate::value::Value;

/// Typed accessor for a (possibly nested) field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessor {
    path: String,
    indices: Vec<usize>,
    data_type: DataType,
    nullable: bool,
}

impl FieldAccessor {
    /// Resolves a dotted path against a record type.
    ///
    /// Each segment is looked up on the type reached by the previous one.
    /// Fails with [`QueryError::FieldNotFound`] naming the failing segment
    /// and the type it was looked up on.
    pub fn resolve(schema: &Schema, record_type: &RecordType, path: &str) -> Result<Self> {
        let mut indices = Vec::new();
        let mut current = record_type;
        let mut resolved: Option<(DataType, bool)> = None;

        for segment in path.split('.') {
            if let Some((data_type, _)) = &resolved {
                let DataType::Record(nested) = data_type else {
                    return Err(QueryError::FieldNotFound {
                        field: segment.to_string(),
                        record_type: data_type.to_string(),
                    });
                };
                current = schema.record_type(nested.as_str())?.as_ref();
            }

            let (idx, def) = current
                .find_field(segment)
                .ok_or_else(|| QueryError::FieldNotFound {
                    field: segment.to_string(),
                    record_type: current.name.to_string(),
                })?;

            indices.push(idx);
            // A path is nullable if any hop on the way can be null.
            let nullable = def.nullable || resolved.as_ref().is_some_and(|(_, n)| *n);
            resolved = Some((def.data_type.clone(), nullable));
        }

        let (data_type, nullable) = resolved.ok_or_else(|| QueryError::FieldNotFound {
            field: path.to_string(),
            record_type: record_type.name.to_string(),
        })?;

        Ok(Self {
            path: path.to_string(),
            indices,
            data_type,
            nullable,
        })
    }

    /// The dotted path as written.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Type of the final field.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// True if the value read may be null.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Reads the field from a record.
    ///
    /// A null intermediate record yields `Null` rather than failing.
    pub fn read<'a>(&self, record: &'a Record) -> &'a Value {
        const NULL: &Value = &Value::Null;

        let mut current = record;
        let last = self.indices.len() - 1;
        for (depth, &idx) in self.indices.iter().enumerate() {
            let value = current.get(idx).unwrap_or(NULL);
            if depth == last {
                return value;
            }
            match value {
                Value::Record(nested) => current = nested,
                _ => return NULL,
            }
        }
        NULL
    }
}

impl Display for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
