use chrono::NaiveDate;
use thiserror::Error;

use crate::config::ConfigError;
use crate::providers::meta_ads::MetaAdsError;
use crate::providers::sheets::SheetsError;

/// Failure taxonomy for one sync invocation. Every variant is terminal for
/// the run; nothing below this level retries or suppresses. A fetch that
/// returns zero rows is not an error and never reaches this type.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("invalid date range: {date_from} is after {date_to}")]
  InvalidRange {
    date_from: NaiveDate,
    date_to: NaiveDate,
  },

  #[error(transparent)]
  Fetch(#[from] MetaAdsError),

  #[error(transparent)]
  Sink(#[from] SheetsError),
}
