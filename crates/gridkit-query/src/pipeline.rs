//! Request execution.
//!
//! Both entry points run the same fixed sequence against a provider:
//! filter, count, aggregate (unpaged), sort and page, then group or list.

use tracing::{debug, instrument};

use crate::aggregate::{AggregateMap, ResolvedAggregator};
use crate::error::Result;
use crate::group::group_many;
use crate::planner::GridPlan;
use crate::provider::{AsyncRecordSource, QuerySource, RecordSource};
use crate::record::Record;
use crate::result::DataSourceResult;
use crate::value::Value;

/// Executes a plan against a blocking provider.
#[instrument(skip_all, fields(record_type = %plan.record_type.name, take = plan.take, skip = plan.skip))]
pub fn execute<S: RecordSource>(source: S, plan: &GridPlan) -> Result<DataSourceResult> {
    let source = apply_filter(source, plan);

    let total = source.count()?;
    debug!(total, "counted");

    let aggregates = match &plan.aggregators {
        Some(aggregators) => Some(reduce_all(aggregators, |a| source.reduce(a))?),
        None => None,
    };

    let records = sort_and_page(source, plan).to_list()?;
    debug!(records = records.len(), "materialized page");

    assemble(plan, total, aggregates, records)
}

/// Executes a plan against an awaitable provider.
///
/// `cancel` is passed to every provider call as is.
#[instrument(skip_all, fields(record_type = %plan.record_type.name, take = plan.take, skip = plan.skip))]
pub async fn execute_async<S: AsyncRecordSource>(
    source: S,
    plan: &GridPlan,
    cancel: &S::Cancel,
) -> Result<DataSourceResult> {
    let source = apply_filter(source, plan);

    let total = source.count_async(cancel).await?;
    debug!(total, "counted");

    let aggregates = match &plan.aggregators {
        Some(aggregators) => {
            let mut map = AggregateMap::new();
            for aggregator in aggregators {
                let value = source.reduce_async(aggregator, cancel).await?;
                map.insert_result(aggregator.field(), aggregator.function, value);
            }
            Some(map)
        }
        None => None,
    };

    let records = sort_and_page(source, plan).to_list_async(cancel).await?;
    debug!(records = records.len(), "materialized page");

    assemble(plan, total, aggregates, records)
}

fn apply_filter<S: QuerySource>(source: S, plan: &GridPlan) -> S {
    match &plan.filter {
        Some(filter) => {
            debug!(predicate = %filter, "applying filter");
            source.filter(filter)
        }
        None => source,
    }
}

fn reduce_all(
    aggregators: &[ResolvedAggregator],
    mut reduce: impl FnMut(&ResolvedAggregator) -> Result<Value>,
) -> Result<AggregateMap> {
    let mut map = AggregateMap::new();
    for aggregator in aggregators {
        map.insert_result(aggregator.field(), aggregator.function, reduce(aggregator)?);
    }
    Ok(map)
}

/// Sorts by the plan's keys, then pages only when `take > 0`.
fn sort_and_page<S: QuerySource>(source: S, plan: &GridPlan) -> S {
    let source = source.sort(&plan.sort);
    if plan.take > 0 {
        source.page(plan.skip, plan.take)
    } else {
        source
    }
}

fn assemble(
    plan: &GridPlan,
    total: usize,
    aggregates: Option<AggregateMap>,
    records: Vec<Record>,
) -> Result<DataSourceResult> {
    let (data, groups) = if plan.is_grouped() {
        let groups = group_many(records, &plan.groups)?;
        debug!(groups = groups.len(), "grouped page");
        (Vec::new(), Some(groups))
    } else {
        (records, None)
    };

    let errors = (!plan.errors.is_empty()).then(|| plan.errors.clone());

    Ok(DataSourceResult {
        data,
        groups,
        aggregates,
        total,
        errors,
    })
}
