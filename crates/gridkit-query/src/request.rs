//! Grid request wire types.

use serde::{Deserialize, Deserializer, Serialize};

use crate::aggregate::Aggregator;
use crate::filter::FilterNode;

/// Sort direction; absent means ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// `{ "field": "Salary", "dir": "desc" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dir: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDirection::Desc,
        }
    }
}

/// A group key with the aggregates to compute per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub field: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dir: SortDirection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aggregates: Vec<Aggregator>,
}

impl Group {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDirection::Asc,
            aggregates: Vec::new(),
        }
    }

    pub fn with_dir(mut self, dir: SortDirection) -> Self {
        self.dir = dir;
        self
    }

    pub fn with_aggregate(mut self, aggregator: Aggregator) -> Self {
        self.aggregates.push(aggregator);
        self
    }
}

/// Filter node as it appears on the wire.
///
/// A descriptor with a `logic` or a non-empty `filters` list is a composite
/// and its `field`/`operator`/`value` are ignored; otherwise it is a leaf.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    #[serde(default, deserialize_with = "null_as_default")]
    pub field: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub operator: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Vec<FilterDescriptor>,
}

impl FilterDescriptor {
    pub fn to_node(&self) -> FilterNode {
        if self.filters.is_empty() && self.logic.is_empty() {
            FilterNode::leaf(self.field.clone(), self.operator.clone(), self.value.clone())
        } else {
            FilterNode::composite(
                self.logic.clone(),
                self.filters.iter().map(FilterDescriptor::to_node).collect(),
            )
        }
    }
}

impl From<FilterNode> for FilterDescriptor {
    fn from(node: FilterNode) -> Self {
        match node {
            FilterNode::Leaf {
                field,
                operator,
                value,
            } => Self {
                field,
                operator,
                value,
                ..Self::default()
            },
            FilterNode::Composite { logic, filters } => Self {
                logic,
                filters: filters.into_iter().map(Into::into).collect(),
                ..Self::default()
            },
        }
    }
}

/// A complete grid request.
///
/// Every field is optional on the wire. `take = 0` means no paging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub take: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skip: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sort: Vec<Sort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<Group>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Vec<Aggregator>>,
}

impl DataSourceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_take(mut self, take: usize) -> Self {
        self.take = take;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.group.get_or_insert_with(Vec::new).push(group);
        self
    }

    pub fn with_aggregate(mut self, aggregator: Aggregator) -> Self {
        self.aggregate.get_or_insert_with(Vec::new).push(aggregator);
        self
    }

    /// Group keys, empty when the request is not grouped.
    pub fn groups(&self) -> &[Group] {
        self.group.as_deref().unwrap_or_default()
    }

    pub fn aggregates(&self) -> &[Aggregator] {
        self.aggregate.as_deref().unwrap_or_default()
    }

    pub fn is_grouped(&self) -> bool {
        !self.groups().is_empty()
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_request() {
        let request: DataSourceRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request, DataSourceRequest::default());
        assert!(!request.is_grouped());
    }

    #[test]
    fn test_full_request() {
        let request: DataSourceRequest = serde_json::from_value(json!({
            "take": 20,
            "skip": 0,
            "sort": [{"field": "Number", "dir": "desc"}, {"field": "Name"}],
            "filter": {
                "logic": "and",
                "filters": [
                    {"field": "Salary", "operator": "gt", "value": 999},
                    {"field": "Name", "operator": "contains", "value": "o"}
                ]
            },
            "group": [{"field": "Gender", "aggregates": [{"field": "Salary", "aggregate": "sum"}]}],
            "aggregate": [{"field": "Number", "aggregate": "max"}]
        }))
        .unwrap();

        assert_eq!(request.take, 20);
        assert_eq!(request.sort, vec![Sort::desc("Number"), Sort::asc("Name")]);
        assert_eq!(
            request.groups(),
            &[Group::new("Gender").with_aggregate(Aggregator::new("Salary", "sum"))]
        );
        assert_eq!(request.aggregates(), &[Aggregator::new("Number", "max")]);

        let node = request.filter.as_ref().unwrap().to_node();
        assert_eq!(
            node,
            FilterNode::and(vec![
                FilterNode::leaf("Salary", "gt", 999),
                FilterNode::leaf("Name", "contains", "o"),
            ])
        );
    }

    #[test]
    fn test_nulls_are_defaults() {
        let request: DataSourceRequest = serde_json::from_value(json!({
            "take": null,
            "sort": null,
            "filter": {"field": "Name", "operator": "isnull", "value": null, "logic": null, "filters": null}
        }))
        .unwrap();
        assert_eq!(request.take, 0);
        assert!(request.sort.is_empty());
        assert_eq!(
            request.filter.unwrap().to_node(),
            FilterNode::leaf("Name", "isnull", serde_json::Value::Null)
        );
    }

    #[test]
    fn test_builder_round_trips_through_json() {
        let request = DataSourceRequest::new()
            .with_take(5)
            .with_sort(Sort::asc("Name"))
            .with_filter(FilterNode::or(vec![FilterNode::leaf("Name", "eq", "Bill")]));

        let json = serde_json::to_value(&request).unwrap();
        let back: DataSourceRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_rejects_unknown_direction() {
        let result: Result<DataSourceRequest, _> =
            serde_json::from_value(json!({"sort": [{"field": "Name", "dir": "up"}]}));
        assert!(result.is_err());
    }
}
