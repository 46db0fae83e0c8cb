use thiserror::Error;

use crate::providers::meta_ads::DEFAULT_API_VERSION;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing required environment variable {0}")]
  MissingVar(&'static str),
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
  std::env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .ok_or(ConfigError::MissingVar(name))
}

fn env_or(name: &str, default: &str) -> String {
  std::env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .unwrap_or_else(|| default.to_string())
}

/// Credentials and identity for the Meta Ads fetcher. Built once, passed
/// into the provider explicitly; nothing in the pipeline reads the
/// environment after construction.
#[derive(Debug, Clone)]
pub struct MetaAdsConfig {
  pub access_token: String,
  pub account_id: String,
  pub api_version: String,
}

impl MetaAdsConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let access_token = require_env("META_ACCESS_TOKEN")?;
    let account_id = require_env("META_AD_ACCOUNT_ID")?;
    let api_version = env_or("META_API_VERSION", DEFAULT_API_VERSION);

    Ok(Self {
      access_token,
      account_id: normalize_account_id(&account_id),
      api_version,
    })
  }
}

// Graph expects the `act_` prefix on ad account ids; accept both forms.
pub fn normalize_account_id(raw: &str) -> String {
  let trimmed = raw.trim();
  if trimmed.starts_with("act_") {
    trimmed.to_string()
  } else {
    format!("act_{trimmed}")
  }
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
  pub credentials_path: String,
  pub spreadsheet_id: String,
  pub data_tab: String,
}

impl SheetsConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Ok(Self {
      credentials_path: require_env("GOOGLE_SHEETS_CREDENTIALS_FILE")?,
      spreadsheet_id: require_env("GOOGLE_SHEETS_SPREADSHEET_ID")?,
      data_tab: env_or("GOOGLE_SHEETS_DATA_TAB", "Dados"),
    })
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub meta: MetaAdsConfig,
  pub sheets: SheetsConfig,
}

impl AppConfig {
  /// Fails on the first missing variable, before any fetch is attempted.
  pub fn from_env() -> Result<Self, ConfigError> {
    Ok(Self {
      meta: MetaAdsConfig::from_env()?,
      sheets: SheetsConfig::from_env()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn account_id_gains_act_prefix_when_missing() {
    assert_eq!(normalize_account_id("123456789"), "act_123456789");
    assert_eq!(normalize_account_id(" act_123456789 "), "act_123456789");
  }
}
