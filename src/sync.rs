use chrono::NaiveDate;

use crate::config::MetaAdsConfig;
use crate::error::SyncError;
use crate::insights::{normalize_rows, MetricRecord, PLATFORM_META_ADS};
use crate::providers::meta_ads::{fetch_insights_with_base_url, InsightsLevel, GRAPH_API_BASE_URL};
use crate::providers::sheets::SheetsClient;

/// Result of one fetch → normalize → append pass. `records` is the
/// normalized per-row output, suitable for aggregation and presentation.
#[derive(Debug)]
pub struct SyncOutcome {
  pub date_from: NaiveDate,
  pub date_to: NaiveDate,
  pub rows_fetched: usize,
  pub rows_skipped: usize,
  pub rows_appended: usize,
  pub records: Vec<MetricRecord>,
}

/// Runs one synchronous pipeline pass over an inclusive date range. The
/// fetch happens exactly once, with no retry; a sink of `None` skips the
/// append stage (dry runs). Zero fetched rows completes successfully with
/// empty output.
pub async fn run_sync(
  meta: &MetaAdsConfig,
  sink: Option<(&SheetsClient, &str)>,
  date_from: NaiveDate,
  date_to: NaiveDate,
  level: InsightsLevel,
) -> Result<SyncOutcome, SyncError> {
  run_sync_with_base_url(meta, GRAPH_API_BASE_URL, sink, date_from, date_to, level).await
}

pub async fn run_sync_with_base_url(
  meta: &MetaAdsConfig,
  graph_base_url: &str,
  sink: Option<(&SheetsClient, &str)>,
  date_from: NaiveDate,
  date_to: NaiveDate,
  level: InsightsLevel,
) -> Result<SyncOutcome, SyncError> {
  if date_from > date_to {
    return Err(SyncError::InvalidRange { date_from, date_to });
  }

  log::info!(
    "syncing {} insights {date_from}..{date_to} level={}",
    meta.account_id,
    level.as_str()
  );

  let raw_rows = fetch_insights_with_base_url(
    &meta.access_token,
    graph_base_url,
    &meta.api_version,
    &meta.account_id,
    date_from,
    date_to,
    level,
  )
  .await?;

  let (records, rows_skipped) = normalize_rows(&raw_rows, PLATFORM_META_ADS);
  if rows_skipped > 0 {
    log::warn!("{rows_skipped} of {} fetched rows had no usable date", raw_rows.len());
  }
  if records.is_empty() {
    log::info!("no insight rows for {date_from}..{date_to}");
  }

  let rows_appended = match sink {
    Some((client, tab)) => {
      client.ensure_header_row(tab).await?;
      client.append_records(tab, &records).await?
    }
    None => 0,
  };

  log::info!(
    "sync done: fetched={} normalized={} appended={rows_appended}",
    raw_rows.len(),
    records.len()
  );

  Ok(SyncOutcome {
    date_from,
    date_to,
    rows_fetched: raw_rows.len(),
    rows_skipped,
    rows_appended,
    records,
  })
}
