//! Runs a grid request over a JSON record file.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gridkit_config::GridkitConfig;
use gridkit_query::{CancelFlag, DataSourceRequest, DataSourceResult, GridEngine, MemorySource};
use tracing::{debug, info};

use crate::schema;
use crate::style::print_warn;

/// Arguments of `gridkit run`.
#[derive(Debug)]
pub struct RunArgs {
    pub schema: PathBuf,
    pub record_type: String,
    pub records: PathBuf,
    /// Request file, or `-` for stdin.
    pub request: String,
    pub compact: bool,
}

pub async fn run(config: &GridkitConfig, args: RunArgs) -> Result<()> {
    let schema = schema::load(&args.schema)?;
    let culture = config.query.culture()?;
    let engine = GridEngine::new(schema).with_culture(culture);

    let records_text = read_file(&args.records)?;
    let records_json: serde_json::Value = serde_json::from_str(&records_text)
        .with_context(|| format!("Invalid JSON in {}", args.records.display()))?;
    let records = engine
        .schema()
        .decode_records(&args.record_type, &records_json, engine.culture())
        .with_context(|| format!("Failed to decode records from {}", args.records.display()))?;
    debug!(records = records.len(), "decoded records");

    let request = read_request(&args.request, config.query.default_take)?;

    let cancel = CancelFlag::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let result = engine
        .execute_async(&args.record_type, MemorySource::new(records), &request, &cancel)
        .await;
    watcher.abort();
    let result = result.context("Request failed")?;

    info!(
        total = result.total,
        grouped = result.is_grouped(),
        "request executed"
    );
    for error in result.errors.iter().flatten() {
        print_warn(&format!("filter ignored: {error}"));
    }

    println!("{}", render(&result, config.output.pretty && !args.compact)?);
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Parses the request, applying `default_take` when the request sets no page size.
fn read_request(source: &str, default_take: usize) -> Result<DataSourceRequest> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read request from stdin")?;
        text
    } else {
        read_file(Path::new(source))?
    };
    parse_request(&text, default_take)
}

fn parse_request(text: &str, default_take: usize) -> Result<DataSourceRequest> {
    let mut request: DataSourceRequest =
        serde_json::from_str(text).context("Invalid request JSON")?;
    if request.take == 0 {
        request.take = default_take;
    }
    Ok(request)
}

fn render(result: &DataSourceResult, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    })
}
