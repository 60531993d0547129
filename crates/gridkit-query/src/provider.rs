//! Record-collection providers.
//!
//! The pipeline never touches storage directly. It drives a provider through
//! [`QuerySource`] (deferred filter/sort/page) and then either
//! [`RecordSource`] or [`AsyncRecordSource`] for the operations that execute:
//! counting, reducing and materializing.
//!
//! [`MemorySource`] implements all three over a `Vec<Record>`.

use std::cmp::Ordering;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use crate::aggregate::{AggregateMap, ResolvedAggregator, aggregate_records};
use crate::error::{QueryError, Result};
use crate::filter::CompiledFilter;
use crate::record::Record;
use crate::request::SortDirection;
use crate::resolve::FieldAccessor;
use crate::value::Value;

/// A resolved sort key.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub accessor: FieldAccessor,
    pub direction: SortDirection,
}

/// Operations a provider may defer until execution.
pub trait QuerySource: Sized {
    /// Keeps only records matching the filter.
    fn filter(self, filter: &CompiledFilter) -> Self;

    /// Stable multi-key sort; the first key has the highest priority.
    fn sort(self, keys: &[SortKey]) -> Self;

    /// Skips `skip` records and keeps at most `take`.
    fn page(self, skip: usize, take: usize) -> Self;
}

/// Blocking execution.
pub trait RecordSource: QuerySource {
    fn count(&self) -> Result<usize>;

    fn reduce(&self, aggregator: &ResolvedAggregator) -> Result<Value>;

    fn to_list(self) -> Result<Vec<Record>>;
}

/// Awaitable execution.
///
/// Each method is one suspend point and receives the caller's cancellation
/// token unchanged.
pub trait AsyncRecordSource: QuerySource {
    /// Cancellation token understood by this provider.
    type Cancel: Sync;

    fn count_async(&self, cancel: &Self::Cancel) -> impl Future<Output = Result<usize>> + Send;

    fn reduce_async(
        &self,
        aggregator: &ResolvedAggregator,
        cancel: &Self::Cancel,
    ) -> impl Future<Output = Result<Value>> + Send;

    fn to_list_async(self, cancel: &Self::Cancel) -> impl Future<Output = Result<Vec<Record>>> + Send;
}

/// Sorts records by the given keys.
///
/// Nulls sort first in ascending order. Values that cannot be compared
/// (records) are treated as equal.
pub fn sort_records(records: &mut [Record], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in keys {
            let cmp = key
                .accessor
                .read(a)
                .compare(key.accessor.read(b))
                .unwrap_or(Ordering::Equal);

            if cmp != Ordering::Equal {
                return match key.direction {
                    SortDirection::Asc => cmp,
                    SortDirection::Desc => cmp.reverse(),
                };
            }
        }
        Ordering::Equal
    });
}

/// Shared cancellation flag for [`MemorySource`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        Ok(())
    }
}

/// In-memory provider. Filtering, sorting and paging apply eagerly.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Computes an aggregate map over the current records.
    pub fn aggregates(&self, aggregators: Option<&[ResolvedAggregator]>) -> Result<Option<AggregateMap>> {
        aggregate_records(aggregators, &self.records)
    }
}

impl From<Vec<Record>> for MemorySource {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<Record> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl QuerySource for MemorySource {
    fn filter(mut self, filter: &CompiledFilter) -> Self {
        self.records.retain(|r| filter.matches(r));
        self
    }

    fn sort(mut self, keys: &[SortKey]) -> Self {
        sort_records(&mut self.records, keys);
        self
    }

    fn page(self, skip: usize, take: usize) -> Self {
        Self::new(self.records.into_iter().skip(skip).take(take).collect())
    }
}

impl RecordSource for MemorySource {
    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn reduce(&self, aggregator: &ResolvedAggregator) -> Result<Value> {
        aggregator.reduce(&self.records)
    }

    fn to_list(self) -> Result<Vec<Record>> {
        Ok(self.records)
    }
}

impl AsyncRecordSource for MemorySource {
    type Cancel = CancelFlag;

    async fn count_async(&self, cancel: &CancelFlag) -> Result<usize> {
        cancel.check()?;
        self.count()
    }

    async fn reduce_async(&self, aggregator: &ResolvedAggregator, cancel: &CancelFlag) -> Result<Value> {
        cancel.check()?;
        self.reduce(aggregator)
    }

    async fn to_list_async(self, cancel: &CancelFlag) -> Result<Vec<Record>> {
        cancel.check()?;
        self.to_list()
    }
}
