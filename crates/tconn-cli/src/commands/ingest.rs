use anyhow::{Context, Result};
use tconn_schemas::BatchAddResponse;

use super::{connect_service, load_records, load_settings};

/// Upsert every record in `file`; prints `{ total, succeeded }`.
///
/// Per-record failures only lower `succeeded`; the command still exits 0.
pub async fn run_ingest(file: &str, config_paths: &[String]) -> Result<()> {
    let records = load_records(file)?;
    let cfg = load_settings(config_paths)?;
    let svc = connect_service(&cfg).await?;

    let succeeded = svc.batch_add(&records).await;
    let resp = BatchAddResponse {
        total: records.len(),
        succeeded,
    };
    println!(
        "{}",
        serde_json::to_string(&resp).context("serialize batch response")?
    );
    Ok(())
}
