//! Request planning.
//!
//! Resolves every field a request references and compiles its filter, so
//! the pipeline itself only sequences provider calls. Filter failures are
//! soft: the plan carries no filter and an error message instead.

use std::sync::Arc;

use tracing::warn;

use crate::aggregate::{ResolvedAggregator, resolve_aggregators};
use crate::culture::Culture;
use crate::error::Result;
use crate::filter::{self, CompiledFilter};
use crate::group::GroupKey;
use crate::provider::SortKey;
use crate::request::{DataSourceRequest, Sort};
use crate::resolve::FieldAccessor;
use crate::schema::{RecordType, Schema};

/// A request resolved against a record type.
#[derive(Debug, Clone)]
pub struct GridPlan {
    pub record_type: Arc<RecordType>,
    pub take: usize,
    pub skip: usize,
    /// Compiled filter; `None` when absent or when compilation failed.
    pub filter: Option<CompiledFilter>,
    /// Messages for filters that failed to compile.
    pub errors: Vec<String>,
    /// Top-level aggregators; `None` when none were requested.
    pub aggregators: Option<Vec<ResolvedAggregator>>,
    /// Explicit sort keys followed by the group keys in reverse order.
    pub sort: Vec<SortKey>,
    pub groups: Vec<GroupKey>,
}

impl GridPlan {
    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Plans a request.
///
/// Unknown sort, group and aggregate fields fail the request. Unsupported
/// aggregates are skipped.
pub fn plan_request(
    schema: &Schema,
    record_type: &Arc<RecordType>,
    request: &DataSourceRequest,
    culture: &Culture,
) -> Result<GridPlan> {
    let mut errors = Vec::new();
    let filter = match &request.filter {
        Some(descriptor) => {
            match filter::compile(schema, record_type, &descriptor.to_node(), culture) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    warn!(record_type = %record_type.name, error = %e, "filter ignored");
                    errors.push(e.to_string());
                    None
                }
            }
        }
        None => None,
    };

    let aggregators = resolve_aggregators(schema, record_type, request.aggregates())?;

    let groups = request
        .groups()
        .iter()
        .map(|group| {
            Ok(GroupKey {
                accessor: FieldAccessor::resolve(schema, record_type, &group.field)?,
                aggregators: resolve_aggregators(schema, record_type, &group.aggregates)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    // Group keys sort after explicit keys, last group key first. Outer groups
    // therefore follow first-encounter order under the inner keys' sort.
    let group_sorts = request.groups().iter().rev().map(|group| Sort {
        field: group.field.clone(),
        dir: group.dir,
    });
    let sort = request
        .sort
        .iter()
        .cloned()
        .chain(group_sorts)
        .map(|s| {
            Ok(SortKey {
                accessor: FieldAccessor::resolve(schema, record_type, &s.field)?,
                direction: s.dir,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GridPlan {
        record_type: Arc::clone(record_type),
        take: request.take,
        skip: request.skip,
        filter,
        errors,
        aggregators,
        sort,
        groups,
    })
}
