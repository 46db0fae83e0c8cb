use chrono::{Duration, NaiveDate, Utc};

use ads_metrics_sync::aggregate::aggregate_by_date;
use ads_metrics_sync::config::AppConfig;
use ads_metrics_sync::providers::meta_ads::InsightsLevel;
use ads_metrics_sync::providers::sheets::{sheets_access_token, SheetsClient};
use ads_metrics_sync::sync::run_sync;

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
  args
    .iter()
    .position(|a| a == flag)
    .and_then(|idx| args.get(idx + 1))
    .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
  args.iter().any(|a| a == flag)
}

fn parse_dt(input: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let args: Vec<String> = std::env::args().collect();

  let days = parse_flag_value(&args, "--days")
    .and_then(|v| v.parse::<i64>().ok())
    .unwrap_or(7)
    .clamp(1, 365);
  let start_arg = parse_flag_value(&args, "--start-dt")
    .or_else(|| parse_flag_value(&args, "--start"))
    .and_then(|v| parse_dt(&v));
  let end_arg = parse_flag_value(&args, "--end-dt")
    .or_else(|| parse_flag_value(&args, "--end"))
    .and_then(|v| parse_dt(&v));
  let dry_run = has_flag(&args, "--dry-run");

  let level = match parse_flag_value(&args, "--level") {
    Some(raw) => match InsightsLevel::parse(&raw) {
      Some(level) => level,
      None => {
        eprintln!("Unknown --level {raw} (expected account or campaign)");
        return Ok(());
      }
    },
    None => InsightsLevel::Campaign,
  };

  let today = Utc::now().date_naive();
  let end_dt = end_arg.unwrap_or(today);
  let start_dt = start_arg.unwrap_or_else(|| end_dt - Duration::days(days));

  if start_dt > end_dt {
    eprintln!("Invalid range: start_dt ({start_dt}) > end_dt ({end_dt})");
    return Ok(());
  }

  let config = AppConfig::from_env()?;

  let sheets = if dry_run {
    None
  } else {
    let token = sheets_access_token(&config.sheets.credentials_path).await?;
    Some(SheetsClient::new(&token, &config.sheets.spreadsheet_id))
  };
  let sink = sheets
    .as_ref()
    .map(|client| (client, config.sheets.data_tab.as_str()));

  let outcome = run_sync(&config.meta, sink, start_dt, end_dt, level).await?;

  println!(
    "ok=true account_id={} start_dt={} end_dt={} level={} fetched_rows={} normalized_rows={} skipped_rows={} appended_rows={} dry_run={dry_run}",
    config.meta.account_id,
    outcome.date_from,
    outcome.date_to,
    level.as_str(),
    outcome.rows_fetched,
    outcome.records.len(),
    outcome.rows_skipped,
    outcome.rows_appended,
  );

  let daily = aggregate_by_date(&outcome.records);
  for day in daily.iter() {
    println!(
      "day dt={} impressions={} clicks={} spend={:.2} leads={} conversions={} cpl={:.2} ctr={:.2}",
      day.date.map(|d| d.to_string()).unwrap_or_else(|| "null".to_string()),
      day.impressions,
      day.clicks,
      day.spend,
      day.leads,
      day.conversions,
      day.cpl,
      day.ctr,
    );
  }

  let total_spend: f64 = daily.iter().map(|d| d.spend).sum();
  let total_leads: i64 = daily.iter().map(|d| d.leads).sum();
  println!("totals days={} spend={total_spend:.2} leads={total_leads}", daily.len());

  Ok(())
}
