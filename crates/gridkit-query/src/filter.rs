//! Filter tree compilation.
//!
//! A [`FilterNode`] tree arrives as data from the grid. [`compile`] resolves
//! every leaf's field, normalizes its literal to the field's type and builds
//! a [`Predicate`] tree. Literals are collected in pre-order into a
//! positional parameter list; each condition refers to its literal as `@n`.
//!
//! Compilation is all-or-nothing: any bad leaf fails the whole tree.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use crate::culture::Culture;
use crate::error::{QueryError, Result};
use crate::record::Record;
use crate::resolve::FieldAccessor;
use crate::schema::{DataType, RecordType, Schema};
use crate::value::Value;

/// A filter tree as posted by the grid.
///
/// Operator and logic strings are kept verbatim; they are validated during
/// compilation so that an unknown operator soft-fails instead of rejecting
/// the whole request.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// A single `field operator value` comparison.
    Leaf {
        field: String,
        operator: String,
        value: serde_json::Value,
    },
    /// A non-empty `and`/`or` combination of child filters.
    Composite {
        logic: String,
        filters: Vec<FilterNode>,
    },
}

impl FilterNode {
    pub fn leaf(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        FilterNode::Leaf {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    pub fn composite(logic: impl Into<String>, filters: Vec<FilterNode>) -> Self {
        FilterNode::Composite {
            logic: logic.into(),
            filters,
        }
    }

    pub fn and(filters: Vec<FilterNode>) -> Self {
        Self::composite("and", filters)
    }

    pub fn or(filters: Vec<FilterNode>) -> Self {
        Self::composite("or", filters)
    }

    /// Returns the leaves in pre-order.
    pub fn leaves(&self) -> Vec<&FilterNode> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a FilterNode>) {
        match self {
            FilterNode::Leaf { .. } => out.push(self),
            FilterNode::Composite { filters, .. } => {
                for child in filters {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// Comparison operators understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    IsNullOrEmpty,
    IsNotNullOrEmpty,
}

impl FilterOperator {
    /// Every operator, in vocabulary order.
    pub const ALL: [FilterOperator; 16] = [
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::Contains,
        FilterOperator::DoesNotContain,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
        FilterOperator::IsNullOrEmpty,
        FilterOperator::IsNotNullOrEmpty,
    ];

    /// Parses the exact wire name of an operator.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::StartsWith => "startswith",
            FilterOperator::EndsWith => "endswith",
            FilterOperator::Contains => "contains",
            FilterOperator::DoesNotContain => "doesnotcontain",
            FilterOperator::IsNull => "isnull",
            FilterOperator::IsNotNull => "isnotnull",
            FilterOperator::IsEmpty => "isempty",
            FilterOperator::IsNotEmpty => "isnotempty",
            FilterOperator::IsNullOrEmpty => "isnullorempty",
            FilterOperator::IsNotNullOrEmpty => "isnotnullorempty",
        }
    }

    /// Operators that only apply to text fields.
    pub fn is_string_only(self) -> bool {
        matches!(
            self,
            FilterOperator::StartsWith
                | FilterOperator::EndsWith
                | FilterOperator::Contains
                | FilterOperator::DoesNotContain
                | FilterOperator::IsEmpty
                | FilterOperator::IsNotEmpty
                | FilterOperator::IsNullOrEmpty
                | FilterOperator::IsNotNullOrEmpty
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            FilterOperator::Lt | FilterOperator::Lte | FilterOperator::Gt | FilterOperator::Gte
        )
    }

    /// True if the operator compares against the leaf's literal.
    pub fn takes_value(self) -> bool {
        !matches!(
            self,
            FilterOperator::IsNull
                | FilterOperator::IsNotNull
                | FilterOperator::IsEmpty
                | FilterOperator::IsNotEmpty
                | FilterOperator::IsNullOrEmpty
                | FilterOperator::IsNotNullOrEmpty
        )
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled predicate tree.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Single condition.
    Condition(Condition),
    /// All children must match.
    And(Vec<Predicate>),
    /// At least one child must match.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Evaluates the predicate against a record with bound parameters.
    pub fn matches(&self, record: &Record, params: &[Value]) -> bool {
        match self {
            Predicate::Condition(c) => c.matches(record, params),
            Predicate::And(children) => children.iter().all(|p| p.matches(record, params)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(record, params)),
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, logic) = match self {
            Predicate::Condition(c) => return write!(f, "{c}"),
            Predicate::And(children) => (children, "and"),
            Predicate::Or(children) => (children, "or"),
        };
        write!(f, "(")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, " {logic} ")?;
            }
            write!(f, "{child}")?;
        }
        write!(f, ")")
    }
}

/// A single compiled comparison.
#[derive(Debug, Clone)]
pub struct Condition {
    pub accessor: FieldAccessor,
    pub operator: FilterOperator,
    /// Position of the literal in the parameter list.
    pub param: usize,
}

impl Condition {
    pub fn matches(&self, record: &Record, params: &[Value]) -> bool {
        let field = self.accessor.read(record);
        let value = params.get(self.param).unwrap_or(&Value::Null);

        match self.operator {
            FilterOperator::Eq => field == value,
            FilterOperator::Neq => field != value,
            FilterOperator::Lt => compare(field, value, Ordering::is_lt),
            FilterOperator::Lte => compare(field, value, Ordering::is_le),
            FilterOperator::Gt => compare(field, value, Ordering::is_gt),
            FilterOperator::Gte => compare(field, value, Ordering::is_ge),
            FilterOperator::StartsWith => text(field, value, |f, v| f.starts_with(v)),
            FilterOperator::EndsWith => text(field, value, |f, v| f.ends_with(v)),
            FilterOperator::Contains => text(field, value, |f, v| f.contains(v)),
            FilterOperator::DoesNotContain => text(field, value, |f, v| !f.contains(v)),
            FilterOperator::IsNull => field.is_null(),
            FilterOperator::IsNotNull => !field.is_null(),
            FilterOperator::IsEmpty => field.as_text() == Some(""),
            FilterOperator::IsNotEmpty => field.as_text() != Some(""),
            FilterOperator::IsNullOrEmpty => is_null_or_empty(field),
            FilterOperator::IsNotNullOrEmpty => !is_null_or_empty(field),
        }
    }
}

/// Ordering comparison; false whenever either side is null.
fn compare(field: &Value, value: &Value, accept: fn(Ordering) -> bool) -> bool {
    if field.is_null() || value.is_null() {
        return false;
    }
    field.compare(value).is_some_and(accept)
}

/// Text test; false when the field is null.
fn text(field: &Value, value: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (field.as_text(), value.as_text()) {
        (Some(f), Some(v)) => test(f, v),
        _ => false,
    }
}

fn is_null_or_empty(field: &Value) -> bool {
    field.is_null() || field.as_text() == Some("")
}

impl Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.accessor.path();
        let p = self.param;
        match self.operator {
            FilterOperator::Eq => write!(f, "{field} = @{p}"),
            FilterOperator::Neq => write!(f, "{field} != @{p}"),
            FilterOperator::Lt => write!(f, "{field} < @{p}"),
            FilterOperator::Lte => write!(f, "{field} <= @{p}"),
            FilterOperator::Gt => write!(f, "{field} > @{p}"),
            FilterOperator::Gte => write!(f, "{field} >= @{p}"),
            FilterOperator::StartsWith
            | FilterOperator::EndsWith
            | FilterOperator::Contains
            | FilterOperator::DoesNotContain => write!(f, "{field} {} @{p}", self.operator),
            FilterOperator::IsNull => write!(f, "{field} is null"),
            FilterOperator::IsNotNull => write!(f, "{field} is not null"),
            FilterOperator::IsEmpty => write!(f, "{field} = \"\""),
            FilterOperator::IsNotEmpty => write!(f, "{field} != \"\""),
            FilterOperator::IsNullOrEmpty => write!(f, "{field} is null or empty"),
            FilterOperator::IsNotNullOrEmpty => write!(f, "{field} is not null or empty"),
        }
    }
}

/// A compiled filter: predicate plus its positional literals.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    predicate: Predicate,
    params: Vec<Value>,
}

impl CompiledFilter {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Normalized literals, indexed by each condition's `param`.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicate.matches(record, &self.params)
    }
}

impl Display for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

/// Compiles a filter tree against a record type.
pub fn compile(
    schema: &Schema,
    record_type: &RecordType,
    node: &FilterNode,
    culture: &Culture,
) -> Result<CompiledFilter> {
    let mut compiler = FilterCompiler {
        schema,
        record_type,
        culture,
        params: Vec::new(),
    };
    let predicate = compiler.compile_node(node)?;
    let compiled = CompiledFilter {
        predicate,
        params: compiler.params,
    };

    debug!(predicate = %compiled, params = compiled.params.len(), "compiled filter");
    Ok(compiled)
}

struct FilterCompiler<'a> {
    schema: &'a Schema,
    record_type: &'a RecordType,
    culture: &'a Culture,
    params: Vec<Value>,
}

impl FilterCompiler<'_> {
    fn compile_node(&mut self, node: &FilterNode) -> Result<Predicate> {
        match node {
            FilterNode::Composite { logic, filters } => {
                let combine: fn(Vec<Predicate>) -> Predicate = match logic.as_str() {
                    "and" => Predicate::And,
                    "or" => Predicate::Or,
                    other => return Err(QueryError::UnsupportedLogic(other.to_string())),
                };
                if filters.is_empty() {
                    return Err(QueryError::EmptyComposite(logic.clone()));
                }
                let children = filters
                    .iter()
                    .map(|child| self.compile_node(child))
                    .collect::<Result<Vec<_>>>()?;
                Ok(combine(children))
            }
            FilterNode::Leaf {
                field,
                operator,
                value,
            } => self.compile_leaf(field, operator, value),
        }
    }

    fn compile_leaf(
        &mut self,
        field: &str,
        operator: &str,
        value: &serde_json::Value,
    ) -> Result<Predicate> {
        let accessor = FieldAccessor::resolve(self.schema, self.record_type, field)?;
        let data_type = accessor.data_type().clone();

        let unsupported = || QueryError::UnsupportedOperator {
            operator: operator.to_string(),
            data_type: data_type.to_string(),
        };
        let op = FilterOperator::parse(operator).ok_or_else(unsupported)?;
        if (op.is_string_only() && !data_type.is_text())
            || (op.is_ordering() && !data_type.is_ordered())
        {
            return Err(unsupported());
        }

        let literal = if op.takes_value() {
            self.normalize_literal(op, value, &data_type)?
        } else {
            Value::Null
        };

        // A whole-day equality on a date becomes a same-day range.
        if let (FilterOperator::Eq, Value::DateTime(dt)) = (op, &literal) {
            if dt.time().with_nanosecond(0) == Some(NaiveTime::MIN) {
                let day = dt.date();
                let start = day.and_time(NaiveTime::MIN);
                let end = day.and_hms_opt(23, 59, 59).unwrap_or(start);
                return Ok(Predicate::And(vec![
                    self.condition(accessor.clone(), FilterOperator::Gte, Value::DateTime(start)),
                    self.condition(accessor, FilterOperator::Lte, Value::DateTime(end)),
                ]));
            }
        }

        Ok(self.condition(accessor, op, literal))
    }

    /// Converts a literal to the field's type.
    ///
    /// Decimals are reparsed from text and date/times are normalized to
    /// local time at millisecond precision.
    fn normalize_literal(
        &self,
        op: FilterOperator,
        value: &serde_json::Value,
        data_type: &DataType,
    ) -> Result<Value> {
        if value.is_null() && !matches!(op, FilterOperator::Eq | FilterOperator::Neq) {
            if op.is_string_only() {
                return Err(QueryError::TypeMismatch {
                    expected: format!("{data_type} literal for '{op}'"),
                    actual: "null".to_string(),
                });
            }
            // Ordering against null never matches.
            return Ok(Value::Null);
        }

        match Value::from_json(value, data_type, self.culture)? {
            Value::DateTime(dt) => Ok(Value::DateTime(truncate_to_millis(dt))),
            other => Ok(other),
        }
    }

    fn condition(&mut self, accessor: FieldAccessor, operator: FilterOperator, literal: Value) -> Predicate {
        let param = self.params.len();
        self.params.push(literal);
        Predicate::Condition(Condition {
            accessor,
            operator,
            param,
        })
    }
}

fn truncate_to_millis(dt: NaiveDateTime) -> NaiveDateTime {
    let millis = dt.nanosecond() / 1_000_000 * 1_000_000;
    dt.with_nanosecond(millis).unwrap_or(dt)
}
