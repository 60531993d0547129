//! Record schemas declared in TOML.
//!
//! ```toml
//! [[records]]
//! name = "Company"
//! fields = [{ name = "Name", type = "text" }]
//!
//! [[records]]
//! name = "Employee"
//! fields = [
//!     { name = "Number", type = "integer", nullable = false },
//!     { name = "Company", type = "record:Company" },
//! ]
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use gridkit_query::{DataType, FieldDef, Schema, SchemaBuilder, TypeName};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    records: Vec<RecordDecl>,
}

#[derive(Debug, Deserialize)]
struct RecordDecl {
    name: String,
    #[serde(default)]
    fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default = "nullable_by_default")]
    nullable: bool,
}

fn nullable_by_default() -> bool {
    true
}

/// Reads and validates a schema file.
pub fn load(path: &Path) -> Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    parse(&text).with_context(|| format!("Invalid schema {}", path.display()))
}

/// Parses schema TOML. Nested record references must name a declared type.
pub fn parse(text: &str) -> Result<Schema> {
    let file: SchemaFile = toml::from_str(text)?;
    if file.records.is_empty() {
        bail!("schema declares no records");
    }

    let mut builder = SchemaBuilder::new();
    for record in &file.records {
        let fields = record
            .fields
            .iter()
            .map(|field| {
                let data_type = parse_type(&field.data_type)
                    .with_context(|| format!("field {}.{}", record.name, field.name))?;
                let def = FieldDef::new(field.name.as_str(), data_type);
                Ok(if field.nullable { def } else { def.not_null() })
            })
            .collect::<Result<Vec<_>>>()?;
        builder = builder.record(record.name.as_str(), fields);
    }
    let schema = builder.build();

    for record in &file.records {
        for field in &record.fields {
            if let Some(target) = field.data_type.strip_prefix("record:")
                && schema.get(&TypeName::from(target.trim())).is_none()
            {
                bail!(
                    "field {}.{} references undeclared record type {}",
                    record.name,
                    field.name,
                    target.trim()
                );
            }
        }
    }
    Ok(schema)
}

fn parse_type(text: &str) -> Result<DataType> {
    let text = text.trim();
    if let Some(target) = text.strip_prefix("record:") {
        return Ok(DataType::Record(TypeName::from(target.trim())));
    }
    Ok(match text {
        "boolean" => DataType::Boolean,
        "integer" => DataType::Integer,
        "real" => DataType::Real,
        "decimal" => DataType::Decimal,
        "text" => DataType::Text,
        "datetime" => DataType::DateTime,
        other => bail!("unknown field type {other:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPLOYEE: &str = r#"
[[records]]
name = "Company"
fields = [{ name = "Name", type = "text" }]

[[records]]
name = "Employee"
fields = [
    { name = "Number", type = "integer", nullable = false },
    { name = "Salary", type = "decimal", nullable = false },
    { name = "Birthday", type = "datetime" },
    { name = "Company", type = "record:Company" },
]
"#;

    #[test]
    fn test_parse_schema() {
        let schema = parse(EMPLOYEE).unwrap();
        assert_eq!(schema.len(), 2);

        let employee = schema.record_type("Employee").unwrap();
        let (_, number) = employee.find_field("Number").unwrap();
        assert_eq!(number.data_type, DataType::Integer);
        assert!(!number.nullable);

        let (_, company) = employee.find_field("Company").unwrap();
        assert_eq!(company.data_type, DataType::Record(TypeName::from("Company")));
        assert!(company.nullable);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = parse("[[records]]\nname = \"A\"\nfields = [{ name = \"X\", type = \"money\" }]\n")
            .unwrap_err();
        assert!(format!("{err:#}").contains("money"));
    }

    #[test]
    fn test_dangling_record_reference_rejected() {
        let err = parse(
            "[[records]]\nname = \"A\"\nfields = [{ name = \"B\", type = \"record:Missing\" }]\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.toml");
        std::fs::write(&path, EMPLOYEE).unwrap();
        assert!(load(&path).is_ok());

        let missing = dir.path().join("nope.toml");
        assert!(load(&missing).is_err());
    }
}
