use ads_metrics_sync::config::MetaAdsConfig;
use ads_metrics_sync::providers::meta_ads::{fetch_account_info, fetch_campaigns};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let config = MetaAdsConfig::from_env()?;

  let account = fetch_account_info(&config.access_token, &config.api_version, &config.account_id).await?;
  println!(
    "account name={} account_id={} currency={} status={}",
    account.name.as_deref().unwrap_or("null"),
    account.account_id.as_deref().unwrap_or("null"),
    account.currency.as_deref().unwrap_or("null"),
    account
      .account_status
      .map(|s| s.to_string())
      .unwrap_or_else(|| "null".to_string()),
  );
  if let Some(business) = account.business_name.as_deref() {
    println!("business name={business}");
  }

  let campaigns = fetch_campaigns(&config.access_token, &config.api_version, &config.account_id).await?;
  println!("campaigns total={}", campaigns.len());
  for campaign in campaigns.iter() {
    println!(
      "campaign id={} name={} status={} objective={}",
      campaign.id,
      campaign.name.as_deref().unwrap_or("null"),
      campaign.status.as_deref().unwrap_or("null"),
      campaign.objective.as_deref().unwrap_or("null"),
    );
  }

  Ok(())
}
