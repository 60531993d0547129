//! Records: positional values tagged with their record type.

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::culture::Culture;
use crate::error::{QueryError, Result};
use crate::schema::{DataType, FieldDef, RecordType, Schema};
use crate::value::Value;

/// A record instance.
///
/// Values are stored in the declaration order of the record type's fields.
/// The type is shared, so cloning a record only clones its values.
#[derive(Debug, Clone)]
pub struct Record {
    record_type: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Creates a record, checking arity, nullability and value types.
    pub fn new(record_type: Arc<RecordType>, values: Vec<Value>) -> Result<Self> {
        if values.len() != record_type.field_count() {
            return Err(QueryError::TypeMismatch {
                expected: format!("{} values for {}", record_type.field_count(), record_type.name),
                actual: format!("{} values", values.len()),
            });
        }
        for (def, value) in record_type.fields.iter().zip(&values) {
            check_field(def, value)?;
        }
        Ok(Self {
            record_type,
            values,
        })
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value at a field position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.record_type
            .find_field(name)
            .and_then(|(idx, _)| self.values.get(idx))
    }

    /// Converts the record to a JSON object keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .record_type
            .fields
            .iter()
            .zip(&self.values)
            .map(|(def, value)| (def.name.to_string(), value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

fn check_field(def: &FieldDef, value: &Value) -> Result<()> {
    let mismatch = || QueryError::TypeMismatch {
        expected: format!("{} for field '{}'", def.data_type, def.name),
        actual: value.data_type().map_or_else(|| "null".to_string(), |t| t.to_string()),
    };

    match value.data_type() {
        None if def.nullable => Ok(()),
        None => Err(mismatch()),
        Some(actual) if actual == def.data_type => Ok(()),
        Some(_) => Err(mismatch()),
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.record_type.name == other.record_type.name && self.values == other.values
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record_type.name.hash(state);
        self.values.hash(state);
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (def, value) in self.record_type.fields.iter().zip(&self.values) {
            map.serialize_entry(def.name.as_str(), value)?;
        }
        map.end()
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, (def, value)) in self.record_type.fields.iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {value}", def.name)?;
        }
        write!(f, " }}")
    }
}

impl Schema {
    /// Decodes a JSON object into a record of the given type.
    ///
    /// Missing keys and explicit nulls decode to `Null`; unknown keys are
    /// ignored. Nested record fields are decoded recursively.
    pub fn decode_record(
        &self,
        record_type: &Arc<RecordType>,
        json: &serde_json::Value,
        culture: &Culture,
    ) -> Result<Record> {
        let object = json.as_object().ok_or_else(|| QueryError::TypeMismatch {
            expected: format!("object for {}", record_type.name),
            actual: json.to_string(),
        })?;

        let mut values = Vec::with_capacity(record_type.field_count());
        for def in &record_type.fields {
            let raw = object.get(def.name.as_str()).unwrap_or(&serde_json::Value::Null);
            let value = match (&def.data_type, raw) {
                (_, serde_json::Value::Null) => Value::Null,
                (DataType::Record(nested), _) => {
                    let nested_type = self.record_type(nested.as_str())?;
                    Value::Record(self.decode_record(nested_type, raw, culture)?)
                }
                (data_type, _) => Value::from_json(raw, data_type, culture)?,
            };
            values.push(value);
        }

        Record::new(Arc::clone(record_type), values)
    }

    /// Decodes a JSON array of objects into records of the named type.
    pub fn decode_records(
        &self,
        record_type: &str,
        json: &serde_json::Value,
        culture: &Culture,
    ) -> Result<Vec<Record>> {
        let record_type = self.record_type(record_type)?;
        let items = json.as_array().ok_or_else(|| QueryError::TypeMismatch {
            expected: format!("array of {}", record_type.name),
            actual: json.to_string(),
        })?;
        items
            .iter()
            .map(|item| self.decode_record(record_type, item, culture))
            .collect()
    }
}
