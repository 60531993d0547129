//! Multi-level grouping.
//!
//! [`group_many`] partitions records by the first group key, attaches that
//! key's aggregates to each partition and recurses with the remaining keys.
//! Once the keys run out every record becomes its own single-item node.

use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::aggregate::{AggregateMap, ResolvedAggregator, aggregate_records};
use crate::error::Result;
use crate::record::Record;
use crate::resolve::FieldAccessor;
use crate::value::Value;

/// A resolved group key with the aggregates computed for each of its groups.
#[derive(Debug, Clone)]
pub struct GroupKey {
    pub accessor: FieldAccessor,
    /// `None` when the group requested no aggregates.
    pub aggregators: Option<Vec<ResolvedAggregator>>,
}

/// One node of the group tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult {
    /// Shared key value, or the record itself for a terminal node.
    pub value: Value,
    /// Field the node was grouped by; empty for terminal nodes.
    pub selector_field: String,
    /// Number of records in the group.
    pub count: usize,
    pub aggregates: Option<AggregateMap>,
    /// Subgroups, or terminal record nodes on the last level.
    pub items: Vec<GroupResult>,
    pub has_subgroups: bool,
}

impl GroupResult {
    /// Display label: `"<field> (<count>)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.selector_field, self.count)
    }

    /// Terminal node wrapping a single record.
    fn terminal(record: Record) -> Self {
        Self {
            value: Value::Record(record),
            selector_field: String::new(),
            count: 1,
            aggregates: None,
            items: Vec::new(),
            has_subgroups: false,
        }
    }

    /// Number of records under this node, counted at the leaves.
    pub fn leaf_count(&self) -> usize {
        if self.items.is_empty() {
            return self.count;
        }
        self.items.iter().map(GroupResult::leaf_count).sum()
    }
}

impl Serialize for GroupResult {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("GroupResult", 5)?;
        s.serialize_field("value", &self.value)?;
        s.serialize_field("field", &self.label())?;
        s.serialize_field("aggregates", &self.aggregates)?;
        s.serialize_field("items", &self.items)?;
        s.serialize_field("hasSubgroups", &self.has_subgroups)?;
        s.end()
    }
}

/// Groups records by each key in turn.
///
/// Groups appear in the order their key value is first seen in `records`.
pub fn group_many(records: Vec<Record>, keys: &[GroupKey]) -> Result<Vec<GroupResult>> {
    let Some((key, rest)) = keys.split_first() else {
        return Ok(records.into_iter().map(GroupResult::terminal).collect());
    };

    let mut partitions: IndexMap<Value, Vec<Record>> = IndexMap::new();
    for record in records {
        let value = key.accessor.read(&record).clone();
        partitions.entry(value).or_default().push(record);
    }

    partitions
        .into_iter()
        .map(|(value, members)| {
            let aggregates = aggregate_records(key.aggregators.as_deref(), &members)?;
            let count = members.len();
            Ok(GroupResult {
                value,
                selector_field: key.accessor.path().to_string(),
                count,
                aggregates,
                items: group_many(members, rest)?,
                has_subgroups: !rest.is_empty(),
            })
        })
        .collect()
}
