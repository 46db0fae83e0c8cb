/// Base counters a ratio metric can be computed from. Aggregates sum these
/// and re-derive; derived values are never summed or averaged directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseMetrics {
  pub impressions: i64,
  pub clicks: i64,
  pub spend: f64,
  pub reach: i64,
  pub conversions: i64,
  pub leads: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedMetrics {
  pub cpc: f64,
  pub cpm: f64,
  pub ctr: f64,
  pub cpl: f64,
  pub conversion_rate: f64,
  pub frequency: f64,
}

pub fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
  if denominator > 0.0 {
    numerator / denominator
  } else {
    0.0
  }
}

pub fn derive_metrics(base: &BaseMetrics) -> DerivedMetrics {
  let impressions = base.impressions as f64;
  let clicks = base.clicks as f64;

  DerivedMetrics {
    cpc: round2(ratio(base.spend, clicks)),
    cpm: round2(ratio(base.spend, impressions) * 1000.0),
    ctr: round2(ratio(clicks, impressions) * 100.0),
    cpl: round2(ratio(base.spend, base.leads as f64)),
    conversion_rate: round2(ratio(base.conversions as f64, clicks) * 100.0),
    frequency: round2(ratio(impressions, base.reach as f64)),
  }
}
