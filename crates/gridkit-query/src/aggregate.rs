//! Aggregate dispatch and reduction.
//!
//! An [`Aggregator`] names a field and an aggregate function. Dispatch picks
//! a [`Reduction`] from the function and the field's declared type; pairs
//! that make no sense (`sum` over text, `min` over a record) have no
//! reduction and are skipped by the caller.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::error::{QueryError, Result};
use crate::record::Record;
use crate::resolve::FieldAccessor;
use crate::schema::{DataType, RecordType, Schema};
use crate::value::Value;

/// A requested aggregate: `{ "field": "Salary", "aggregate": "sum" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregator {
    pub field: String,
    pub aggregate: String,
}

impl Aggregator {
    pub fn new(field: impl Into<String>, aggregate: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            aggregate: aggregate.into(),
        }
    }
}

/// Supported aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(AggregateFunction::Sum),
            "average" => Some(AggregateFunction::Average),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "count" => Some(AggregateFunction::Count),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Average => "average",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
        }
    }
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type-specific reduction over field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    /// Sum in the field's numeric type.
    Sum(DataType),
    /// Mean; integers average to `Real`, decimals stay exact.
    Average(DataType),
    Min,
    Max,
    /// Number of elements.
    Count,
    /// Number of non-null values.
    CountNonNull,
}

impl Reduction {
    /// Picks the reduction for a function applied to a field type.
    ///
    /// Returns `None` when the pair is unsupported.
    pub fn dispatch(function: AggregateFunction, data_type: &DataType, nullable: bool) -> Option<Self> {
        match function {
            AggregateFunction::Sum if data_type.is_numeric() => Some(Reduction::Sum(data_type.clone())),
            AggregateFunction::Average if data_type.is_numeric() => {
                Some(Reduction::Average(data_type.clone()))
            }
            AggregateFunction::Min if data_type.is_ordered() => Some(Reduction::Min),
            AggregateFunction::Max if data_type.is_ordered() => Some(Reduction::Max),
            AggregateFunction::Count if nullable => Some(Reduction::CountNonNull),
            AggregateFunction::Count => Some(Reduction::Count),
            _ => None,
        }
    }

    /// Runs the reduction. Null values are ignored by every reduction except
    /// [`Reduction::Count`].
    ///
    /// Empty input yields 0 for sums and counts and `Null` otherwise.
    pub fn apply<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> Result<Value> {
        let mut values = values.into_iter();
        match self {
            Reduction::Count => Ok(Value::Integer(count(values.count()))),
            Reduction::CountNonNull => Ok(Value::Integer(count(
                values.filter(|v| !v.is_null()).count(),
            ))),
            Reduction::Min => Ok(extreme(values, std::cmp::Ordering::Less)),
            Reduction::Max => Ok(extreme(values, std::cmp::Ordering::Greater)),
            Reduction::Sum(data_type) => {
                let (sum, _) = sum(data_type, &mut values)?;
                Ok(sum)
            }
            Reduction::Average(data_type) => {
                let (sum, n) = sum(data_type, &mut values)?;
                if n == 0 {
                    return Ok(Value::Null);
                }
                match sum {
                    Value::Integer(total) => Ok(Value::Real(total as f64 / n as f64)),
                    Value::Real(total) => Ok(Value::Real(total / n as f64)),
                    Value::Decimal(total) => total
                        .checked_div(Decimal::from(n))
                        .map(Value::Decimal)
                        .ok_or_else(|| overflow("average")),
                    _ => Ok(Value::Null),
                }
            }
        }
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn overflow(what: &str) -> QueryError {
    QueryError::ProviderExecution(format!("arithmetic overflow in {what}"))
}

/// Min or max of the non-null values, keeping the first of equal values.
fn extreme<'a>(values: impl Iterator<Item = &'a Value>, wanted: std::cmp::Ordering) -> Value {
    values
        .filter(|v| !v.is_null())
        .fold(None::<&Value>, |best, v| match best {
            Some(b) if v.compare(b) != Some(wanted) => Some(b),
            _ => Some(v),
        })
        .cloned()
        .unwrap_or(Value::Null)
}

/// Sums the non-null values, returning the sum and how many were added.
fn sum<'a>(data_type: &DataType, values: impl Iterator<Item = &'a Value>) -> Result<(Value, u64)> {
    let mut n = 0u64;
    let total = match data_type {
        DataType::Integer => {
            let mut total = 0i64;
            for v in values.filter_map(Value::as_integer) {
                total = total.checked_add(v).ok_or_else(|| overflow("sum"))?;
                n += 1;
            }
            Value::Integer(total)
        }
        DataType::Real => {
            let mut total = 0f64;
            for v in values.filter_map(Value::as_real) {
                total += v;
                n += 1;
            }
            Value::Real(total)
        }
        DataType::Decimal => {
            let mut total = Decimal::ZERO;
            for v in values.filter_map(Value::as_decimal) {
                total = total.checked_add(v).ok_or_else(|| overflow("sum"))?;
                n += 1;
            }
            Value::Decimal(total)
        }
        other => {
            return Err(QueryError::TypeMismatch {
                expected: "numeric field".to_string(),
                actual: other.to_string(),
            });
        }
    };
    Ok((total, n))
}

/// An aggregator resolved against a record type.
#[derive(Debug, Clone)]
pub struct ResolvedAggregator {
    pub accessor: FieldAccessor,
    pub function: AggregateFunction,
    pub reduction: Reduction,
}

impl ResolvedAggregator {
    /// Resolves one aggregator.
    ///
    /// Fails with [`QueryError::FieldNotFound`] for a bad field and
    /// [`QueryError::UnsupportedAggregate`] for an unknown function or one
    /// that does not apply to the field's type.
    pub fn resolve(schema: &Schema, record_type: &RecordType, aggregator: &Aggregator) -> Result<Self> {
        let accessor = FieldAccessor::resolve(schema, record_type, &aggregator.field)?;
        let unsupported = || QueryError::UnsupportedAggregate {
            aggregate: aggregator.aggregate.clone(),
            field: aggregator.field.clone(),
        };
        let function = AggregateFunction::parse(&aggregator.aggregate).ok_or_else(unsupported)?;
        let reduction = Reduction::dispatch(function, accessor.data_type(), accessor.is_nullable())
            .ok_or_else(unsupported)?;
        Ok(Self {
            accessor,
            function,
            reduction,
        })
    }

    /// Field path the result is keyed by.
    pub fn field(&self) -> &str {
        self.accessor.path()
    }

    /// Runs the reduction over in-memory records.
    pub fn reduce(&self, records: &[Record]) -> Result<Value> {
        self.reduction
            .apply(records.iter().map(|r| self.accessor.read(r)))
    }
}

/// Resolves a list of aggregators, skipping unsupported ones.
///
/// Returns `None` for an empty request. Unknown fields are fatal;
/// unsupported function/type pairs are dropped with a warning.
pub fn resolve_aggregators(
    schema: &Schema,
    record_type: &RecordType,
    aggregators: &[Aggregator],
) -> Result<Option<Vec<ResolvedAggregator>>> {
    if aggregators.is_empty() {
        return Ok(None);
    }
    let mut resolved = Vec::with_capacity(aggregators.len());
    for aggregator in aggregators {
        match ResolvedAggregator::resolve(schema, record_type, aggregator) {
            Ok(r) => resolved.push(r),
            Err(e @ QueryError::UnsupportedAggregate { .. }) => {
                warn!(field = %aggregator.field, aggregate = %aggregator.aggregate, error = %e, "skipping aggregator");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Some(resolved))
}

/// Computes the aggregate map over in-memory records.
///
/// Returns `None` when no aggregates were requested. A request whose
/// aggregators were all skipped yields an empty map.
pub fn aggregate_records(
    aggregators: Option<&[ResolvedAggregator]>,
    records: &[Record],
) -> Result<Option<AggregateMap>> {
    let Some(aggregators) = aggregators else {
        return Ok(None);
    };
    let mut map = AggregateMap::new();
    for aggregator in aggregators {
        map.insert_result(aggregator.field(), aggregator.function, aggregator.reduce(records)?);
    }
    Ok(Some(map))
}

/// A node in an aggregate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateNode {
    Value(Value),
    Map(AggregateMap),
}

impl Serialize for AggregateNode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AggregateNode::Value(v) => v.serialize(serializer),
            AggregateNode::Map(m) => m.serialize(serializer),
        }
    }
}

impl Display for AggregateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateNode::Value(v) => write!(f, "{v}"),
            AggregateNode::Map(m) => write!(f, "{m}"),
        }
    }
}

/// Ordered string-keyed aggregate tree.
///
/// The top level is keyed by field, the second by aggregate name:
/// `{ Salary = { sum = 14850, average = 2970 }, Number = { max = 6 } }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateMap {
    entries: IndexMap<String, AggregateNode>,
}

impl AggregateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one aggregate result under its field.
    ///
    /// Fields keep the order of their first appearance; a repeated
    /// (field, function) pair keeps its first result.
    pub fn insert_result(&mut self, field: &str, function: AggregateFunction, value: Value) {
        let field_node = self
            .entries
            .entry(field.to_string())
            .or_insert_with(|| AggregateNode::Map(AggregateMap::new()));
        if let AggregateNode::Map(map) = field_node {
            map.entries
                .entry(function.as_str().to_string())
                .or_insert(AggregateNode::Value(value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&AggregateNode> {
        self.entries.get(key)
    }

    /// Looks up `field` then `aggregate`.
    pub fn value(&self, field: &str, aggregate: &str) -> Option<&Value> {
        match self.get(field)? {
            AggregateNode::Map(m) => match m.get(aggregate)? {
                AggregateNode::Value(v) => Some(v),
                AggregateNode::Map(_) => None,
            },
            AggregateNode::Value(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for AggregateMap {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, node) in &self.entries {
            map.serialize_entry(key, node)?;
        }
        map.end()
    }
}

impl Display for AggregateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for (i, (key, node)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key} = {node}")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AggregateFunction::Sum, DataType::Text => None ; "sum over text")]
    #[test_case(AggregateFunction::Average, DataType::Boolean => None ; "average over bool")]
    #[test_case(AggregateFunction::Min, DataType::Record("Company".into()) => None ; "min over record")]
    #[test_case(AggregateFunction::Max, DataType::Text => Some(Reduction::Max) ; "max over text")]
    #[test_case(AggregateFunction::Sum, DataType::Decimal => Some(Reduction::Sum(DataType::Decimal)) ; "sum over decimal")]
    fn test_dispatch(function: AggregateFunction, data_type: DataType) -> Option<Reduction> {
        Reduction::dispatch(function, &data_type, false)
    }

    #[test]
    fn test_count_is_nullable_aware() {
        let values = [Value::Integer(1), Value::Null, Value::Integer(3), Value::Null];
        let nullable = Reduction::dispatch(AggregateFunction::Count, &DataType::Integer, true).unwrap();
        let required = Reduction::dispatch(AggregateFunction::Count, &DataType::Integer, false).unwrap();

        assert_eq!(nullable.apply(&values).unwrap(), Value::Integer(2));
        assert_eq!(required.apply(&values).unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_empty_input() {
        let empty: [Value; 0] = [];
        assert_eq!(Reduction::Count.apply(&empty).unwrap(), Value::Integer(0));
        assert_eq!(
            Reduction::Sum(DataType::Decimal).apply(&empty).unwrap(),
            Value::Decimal(Decimal::ZERO)
        );
        assert_eq!(Reduction::Sum(DataType::Integer).apply(&empty).unwrap(), Value::Integer(0));
        assert!(Reduction::Average(DataType::Real).apply(&empty).unwrap().is_null());
        assert!(Reduction::Min.apply(&empty).unwrap().is_null());
        assert!(Reduction::Max.apply(&empty).unwrap().is_null());
    }

    #[test]
    fn test_integer_average_is_real() {
        let values = [Value::Integer(1), Value::Integer(2)];
        assert_eq!(
            Reduction::Average(DataType::Integer).apply(&values).unwrap(),
            Value::Real(1.5)
        );
    }

    #[test]
    fn test_decimal_average_is_exact() {
        let values: Vec<Value> = [3000, 2850, 6000, 3000, 0]
            .into_iter()
            .map(|n| Value::Decimal(Decimal::from(n)))
            .collect();
        assert_eq!(
            Reduction::Average(DataType::Decimal).apply(&values).unwrap(),
            Value::Decimal(Decimal::from(2970))
        );
    }

    #[test]
    fn test_integer_sum_overflow() {
        let values = [Value::Integer(i64::MAX), Value::Integer(1)];
        assert!(matches!(
            Reduction::Sum(DataType::Integer).apply(&values),
            Err(QueryError::ProviderExecution(_))
        ));
    }

    #[test]
    fn test_min_max_skip_nulls() {
        let values = [Value::Null, Value::from("b"), Value::from("a"), Value::from("c")];
        assert_eq!(Reduction::Min.apply(&values).unwrap(), Value::from("a"));
        assert_eq!(Reduction::Max.apply(&values).unwrap(), Value::from("c"));
    }

    #[test]
    fn test_map_groups_by_field() {
        let mut map = AggregateMap::new();
        map.insert_result("Salary", AggregateFunction::Sum, Value::Decimal(Decimal::from(14850)));
        map.insert_result("Number", AggregateFunction::Max, Value::Integer(6));
        map.insert_result("Salary", AggregateFunction::Average, Value::Decimal(Decimal::from(2970)));
        map.insert_result("Salary", AggregateFunction::Sum, Value::Integer(0));

        assert_eq!(
            map.to_string(),
            "{ Salary = { sum = 14850, average = 2970 }, Number = { max = 6 } }"
        );
        assert_eq!(map.value("Number", "max"), Some(&Value::Integer(6)));
        assert_eq!(
            map.to_json(),
            serde_json::json!({"Salary": {"sum": 14850, "average": 2970}, "Number": {"max": 6}})
        );
    }
}
