//! # gridkit-query: declarative data-grid queries
//!
//! This crate evaluates grid requests (paging, sorting, nested filters,
//! multi-level grouping and aggregates expressed as JSON) against records of
//! any registered type, without per-type query code.
//!
//! ## Request model
//!
//! - Filters: trees of `and`/`or` composites over leaves
//!   `{ field, operator, value }` with operators `eq`, `neq`, `lt`, `lte`,
//!   `gt`, `gte`, `startswith`, `endswith`, `contains`, `doesnotcontain`,
//!   `isnull`, `isnotnull`, `isempty`, `isnotempty`, `isnullorempty`,
//!   `isnotnullorempty`
//! - Aggregates: `sum`, `average`, `min`, `max`, `count`
//! - Dotted field paths into nested records (`Company.Name`)
//!
//! A filter that fails to compile is not fatal: the request runs
//! unfiltered and the message is returned in `errors`.
//!
//! ## Execution order
//!
//! 1. Filter
//! 2. Count (total after filtering)
//! 3. Aggregate over the unpaged, filtered set
//! 4. Sort (explicit keys, then group keys) and page when `take > 0`
//! 5. Group the page, or list it
//!
//! ## Usage
//!
//! ```ignore
//! use gridkit_query::{DataSourceRequest, DataType, FieldDef, GridEngine, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new()
//!     .record(
//!         "Employee",
//!         vec![
//!             FieldDef::new("Number", DataType::Integer).not_null(),
//!             FieldDef::new("Salary", DataType::Decimal).not_null(),
//!         ],
//!     )
//!     .build();
//!
//! let engine = GridEngine::new(schema);
//! let result = engine.execute_json("Employee", records_json, request_json)?;
//! println!("{}", serde_json::to_string(&result)?);
//! ```

mod aggregate;
mod culture;
mod error;
mod filter;
mod group;
mod pipeline;
mod planner;
mod provider;
mod record;
mod request;
mod resolve;
mod result;
mod schema;
mod value;


// Re-export public types
pub use aggregate::{
    AggregateFunction, AggregateMap, AggregateNode, Aggregator, Reduction, ResolvedAggregator,
    aggregate_records, resolve_aggregators,
};
pub use culture::Culture;
pub use error::{QueryError, Result};
pub use filter::{CompiledFilter, Condition, FilterNode, FilterOperator, Predicate, compile};
pub use group::{GroupKey, GroupResult, group_many};
pub use pipeline::{execute, execute_async};
pub use planner::{GridPlan, plan_request};
pub use provider::{
    AsyncRecordSource, CancelFlag, MemorySource, QuerySource, RecordSource, SortKey, sort_records,
};
pub use record::Record;
pub use request::{DataSourceRequest, FilterDescriptor, Group, Sort, SortDirection};
pub use resolve::FieldAccessor;
pub use result::DataSourceResult;
pub use schema::{DataType, FieldDef, FieldName, RecordType, Schema, SchemaBuilder, TypeName};
pub use value::Value;

/// Grid query engine.
///
/// The engine is stateless and can be shared across threads. It holds only
/// the schema and the parsing culture; every request allocates its own state.
#[derive(Debug, Clone, Default)]
pub struct GridEngine {
    schema: Schema,
    culture: Culture,
}

impl GridEngine {
    /// Creates an engine with the invariant culture.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            culture: Culture::invariant(),
        }
    }

    /// Sets the culture used for literals and decoded records.
    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    /// Resolves a request against a record type without executing it.
    pub fn plan(&self, record_type: &str, request: &DataSourceRequest) -> Result<GridPlan> {
        let record_type = self.schema.record_type(record_type)?;
        planner::plan_request(&self.schema, record_type, request, &self.culture)
    }

    /// Executes a request over in-memory records.
    pub fn execute(
        &self,
        record_type: &str,
        records: Vec<Record>,
        request: &DataSourceRequest,
    ) -> Result<DataSourceResult> {
        self.execute_source(record_type, MemorySource::new(records), request)
    }

    /// Executes a request against any blocking provider.
    pub fn execute_source<S: RecordSource>(
        &self,
        record_type: &str,
        source: S,
        request: &DataSourceRequest,
    ) -> Result<DataSourceResult> {
        let plan = self.plan(record_type, request)?;
        pipeline::execute(source, &plan)
    }

    /// Executes a request against an awaitable provider.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let cancel = CancelFlag::new();
    /// let result = engine
    ///     .execute_async("Employee", MemorySource::new(records), &request, &cancel)
    ///     .await?;
    /// ```
    pub async fn execute_async<S: AsyncRecordSource>(
        &self,
        record_type: &str,
        source: S,
        request: &DataSourceRequest,
        cancel: &S::Cancel,
    ) -> Result<DataSourceResult> {
        let plan = self.plan(record_type, request)?;
        pipeline::execute_async(source, &plan, cancel).await
    }

    /// Pages, sorts and filters without grouping or aggregates.
    pub fn execute_simple(
        &self,
        record_type: &str,
        records: Vec<Record>,
        take: usize,
        skip: usize,
        sort: Vec<Sort>,
        filter: Option<FilterNode>,
    ) -> Result<DataSourceResult> {
        let request = DataSourceRequest {
            take,
            skip,
            sort,
            filter: filter.map(FilterDescriptor::from),
            ..DataSourceRequest::default()
        };
        self.execute(record_type, records, &request)
    }

    /// Decodes records (a JSON array) and a request, then executes.
    pub fn execute_json(
        &self,
        record_type: &str,
        records_json: &str,
        request_json: &str,
    ) -> Result<DataSourceResult> {
        let records: serde_json::Value = serde_json::from_str(records_json)?;
        let records = self.schema.decode_records(record_type, &records, &self.culture)?;
        let request: DataSourceRequest = serde_json::from_str(request_json)?;
        self.execute(record_type, records, &request)
    }
}
