use std::collections::HashMap;

use chrono::NaiveDate;

use crate::insights::MetricRecord;
use crate::metrics::{derive_metrics, round2, BaseMetrics};

/// Grouping dimension for a roll-up. `Date` crosses campaigns, `Campaign`
/// crosses days, `DatePlatform` keeps per-source daily totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
  Date,
  Campaign,
  DatePlatform,
}

/// A record with an absent key value forms its own group instead of being
/// dropped, so the output remains a partition of the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
  Date(Option<NaiveDate>),
  Campaign(Option<String>),
  DatePlatform(Option<NaiveDate>, String),
}

pub fn group_key_for(record: &MetricRecord, group_by: GroupBy) -> GroupKey {
  match group_by {
    GroupBy::Date => GroupKey::Date(record.date),
    GroupBy::Campaign => GroupKey::Campaign(record.campaign_id.clone()),
    GroupBy::DatePlatform => GroupKey::DatePlatform(record.date, record.platform.clone()),
  }
}

/// Sums base counters per group and recomputes every ratio metric from the
/// summed bases. Averaging the members' own ratios would be wrong whenever
/// denominators differ across members, so member cpc/cpm/ctr/cpl values are
/// ignored here.
///
/// Groups appear in first-seen input order. Empty input yields empty output.
pub fn aggregate(records: &[MetricRecord], group_by: GroupBy) -> Vec<MetricRecord> {
  let mut index: HashMap<GroupKey, usize> = HashMap::new();
  let mut groups: Vec<MetricRecord> = Vec::new();

  for record in records {
    let key = group_key_for(record, group_by);
    let idx = match index.get(&key) {
      Some(i) => *i,
      None => {
        groups.push(seed_group(record, group_by));
        index.insert(key, groups.len() - 1);
        groups.len() - 1
      }
    };

    let group = &mut groups[idx];
    group.impressions += record.impressions;
    group.clicks += record.clicks;
    group.spend += record.spend;
    group.reach += record.reach;
    group.conversions += record.conversions;
    group.leads += record.leads;
  }

  for group in groups.iter_mut() {
    let derived = derive_metrics(&BaseMetrics {
      impressions: group.impressions,
      clicks: group.clicks,
      spend: group.spend,
      reach: group.reach,
      conversions: group.conversions,
      leads: group.leads,
    });
    group.cpc = derived.cpc;
    group.cpm = derived.cpm;
    group.ctr = derived.ctr;
    group.cpl = derived.cpl;
    group.conversion_rate = derived.conversion_rate;
    group.frequency = derived.frequency;
    group.spend = round2(group.spend);
  }

  groups
}

pub fn aggregate_by_date(records: &[MetricRecord]) -> Vec<MetricRecord> {
  aggregate(records, GroupBy::Date)
}

pub fn aggregate_by_campaign(records: &[MetricRecord]) -> Vec<MetricRecord> {
  aggregate(records, GroupBy::Campaign)
}

// Identity fields are carried only when the group key pins them to a single
// value; a date group spanning campaigns must not claim one campaign name.
fn seed_group(record: &MetricRecord, group_by: GroupBy) -> MetricRecord {
  let (date, campaign_id, campaign_name) = match group_by {
    GroupBy::Date => (record.date, None, None),
    GroupBy::Campaign => (None, record.campaign_id.clone(), record.campaign_name.clone()),
    GroupBy::DatePlatform => (record.date, None, None),
  };

  MetricRecord {
    date,
    campaign_id,
    campaign_name,
    impressions: 0,
    clicks: 0,
    spend: 0.0,
    reach: 0,
    frequency: 0.0,
    cpc: 0.0,
    cpm: 0.0,
    ctr: 0.0,
    conversions: 0,
    leads: 0,
    platform: record.platform.clone(),
    cpl: 0.0,
    conversion_rate: 0.0,
  }
}
