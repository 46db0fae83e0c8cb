use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::metrics::round2;

pub const PLATFORM_META_ADS: &str = "Meta Ads";

/// One normalized day of performance for an account or campaign. Built once
/// from a raw insight row and immutable afterwards; aggregation produces new
/// records rather than mutating members.
///
/// `date` is always present on normalized records. Aggregates leave it (and
/// the campaign fields) empty when the grouping key does not pin a single
/// consistent value.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricRecord {
  pub date: Option<NaiveDate>,
  pub campaign_id: Option<String>,
  pub campaign_name: Option<String>,
  pub impressions: i64,
  pub clicks: i64,
  pub spend: f64,
  pub reach: i64,
  pub frequency: f64,
  pub cpc: f64,
  pub cpm: f64,
  pub ctr: f64,
  pub conversions: i64,
  pub leads: i64,
  pub platform: String,
  pub cpl: f64,
  pub conversion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionRule {
  ContainsLead,
  ContainsConversionOrPurchase,
}

// Evaluated in order; the first matching rule claims the whole action, so a
// type like "lead_conversion" counts as a lead only.
const ACTION_RULES: [ActionRule; 2] = [
  ActionRule::ContainsLead,
  ActionRule::ContainsConversionOrPurchase,
];

impl ActionRule {
  fn matches(self, action_type: &str) -> bool {
    match self {
      ActionRule::ContainsLead => action_type.contains("lead"),
      ActionRule::ContainsConversionOrPurchase => {
        action_type.contains("conversion") || action_type.contains("purchase")
      }
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionCounts {
  pub leads: i64,
  pub conversions: i64,
}

/// Buckets a row's `actions` sub-events into lead and conversion counts.
/// Unknown action types and unparseable values contribute nothing.
pub fn classify_actions(actions: &[Value]) -> ActionCounts {
  let mut counts = ActionCounts::default();

  for action in actions {
    let action_type = action
      .get("action_type")
      .and_then(|v| v.as_str())
      .unwrap_or("")
      .to_ascii_lowercase();
    let value = action
      .get("value")
      .and_then(coerce_i64)
      .unwrap_or(0)
      .max(0);

    for rule in ACTION_RULES {
      if rule.matches(&action_type) {
        match rule {
          ActionRule::ContainsLead => counts.leads += value,
          ActionRule::ContainsConversionOrPurchase => counts.conversions += value,
        }
        break;
      }
    }
  }

  counts
}

pub fn coerce_i64(v: &Value) -> Option<i64> {
  v.as_i64()
    .or_else(|| v.as_f64().map(|n| n as i64))
    .or_else(|| {
      let s = v.as_str()?.trim();
      s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(|n| n as i64))
    })
}

pub fn coerce_f64(v: &Value) -> Option<f64> {
  v.as_f64()
    .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn non_empty_string(v: Option<&Value>) -> Option<String> {
  v.and_then(|v| v.as_str())
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn coerce_counter(raw: &Value, field: &str) -> i64 {
  raw.get(field).and_then(coerce_i64).unwrap_or(0).max(0)
}

fn coerce_number(raw: &Value, field: &str) -> f64 {
  raw
    .get(field)
    .and_then(coerce_f64)
    .unwrap_or(0.0)
    .max(0.0)
}

/// Converts one raw Graph insight row into a canonical record. Returns None
/// only when the row has no parseable `date_start`; every malformed numeric
/// field degrades to zero instead of failing the row.
///
/// Provider-supplied cpc/cpm/ctr/frequency are passed through at record
/// granularity; cpl and conversion rate are computed here from the
/// classified actions. All ratios are recomputed from summed bases when
/// records are aggregated.
pub fn normalize_insight_row(raw: &Value, platform: &str) -> Option<MetricRecord> {
  let date_str = raw.get("date_start").and_then(|v| v.as_str()).unwrap_or("");
  let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()?;

  let actions = raw
    .get("actions")
    .and_then(|v| v.as_array())
    .map(Vec::as_slice)
    .unwrap_or(&[]);
  let counts = classify_actions(actions);

  let clicks = coerce_counter(raw, "clicks");
  let spend = coerce_number(raw, "spend");

  let cpl = if counts.leads > 0 {
    round2(spend / counts.leads as f64)
  } else {
    0.0
  };
  let conversion_rate = if clicks > 0 {
    round2(counts.conversions as f64 / clicks as f64 * 100.0)
  } else {
    0.0
  };

  Some(MetricRecord {
    date: Some(date),
    campaign_id: non_empty_string(raw.get("campaign_id")),
    campaign_name: non_empty_string(raw.get("campaign_name")),
    impressions: coerce_counter(raw, "impressions"),
    clicks,
    spend,
    reach: coerce_counter(raw, "reach"),
    frequency: coerce_number(raw, "frequency"),
    cpc: coerce_number(raw, "cpc"),
    cpm: coerce_number(raw, "cpm"),
    ctr: coerce_number(raw, "ctr"),
    conversions: counts.conversions,
    leads: counts.leads,
    platform: platform.to_string(),
    cpl,
    conversion_rate,
  })
}

/// Normalizes a fetched batch. Returns the records plus the count of rows
/// skipped for lacking a date; one parseable raw row always yields exactly
/// one record.
pub fn normalize_rows(raw_rows: &[Value], platform: &str) -> (Vec<MetricRecord>, usize) {
  let mut records = Vec::with_capacity(raw_rows.len());
  let mut skipped = 0usize;

  for raw in raw_rows {
    match normalize_insight_row(raw, platform) {
      Some(record) => records.push(record),
      None => {
        skipped += 1;
        log::warn!("skipping insight row without a parseable date_start");
      }
    }
  }

  (records, skipped)
}
