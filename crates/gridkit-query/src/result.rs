//! Grid result wire type.

use serde::Serialize;

use crate::aggregate::AggregateMap;
use crate::group::GroupResult;
use crate::record::Record;

/// The assembled response to a grid request.
///
/// `data` and `groups` are mutually exclusive: a grouped request returns an
/// empty `data` list and a `groups` tree. `groups`, `aggregates` and
/// `errors` are omitted from JSON when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataSourceResult {
    pub data: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<AggregateMap>,
    /// Number of records after filtering, before paging.
    pub total: usize,
    /// Non-fatal errors, currently only filter compilation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl DataSourceResult {
    pub fn is_grouped(&self) -> bool {
        self.groups.is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}
