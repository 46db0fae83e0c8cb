use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::{BodyExt, Empty};
use hyper::header::{ACCEPT, AUTHORIZATION};
use hyper::{Method, Request, StatusCode};
use serde_json::Value;

pub const GRAPH_API_BASE_URL: &str = "https://graph.facebook.com/";
pub const DEFAULT_API_VERSION: &str = "v19.0";

// Metrics requested per insight row; `actions` carries the lead/conversion
// sub-events classified during normalization.
const INSIGHTS_FIELDS: &str = "campaign_id,campaign_name,date_start,date_stop,impressions,clicks,spend,reach,frequency,cpc,cpm,ctr,actions";

const CAMPAIGN_FIELDS: &str = "id,name,status,objective,created_time";

const ACCOUNT_FIELDS: &str = "name,account_id,currency,account_status,business_name";

// Paging cursors normally terminate on their own; the cap only guards
// against a sink of identical `next` links.
const MAX_PAGES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightsLevel {
  Account,
  Campaign,
}

impl InsightsLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      InsightsLevel::Account => "account",
      InsightsLevel::Campaign => "campaign",
    }
  }

  pub fn parse(input: &str) -> Option<Self> {
    match input.trim().to_ascii_lowercase().as_str() {
      "account" => Some(InsightsLevel::Account),
      "campaign" => Some(InsightsLevel::Campaign),
      _ => None,
    }
  }
}

#[derive(Debug)]
pub struct MetaAdsError {
  pub status: Option<u16>,
  pub message: String,
}

impl std::fmt::Display for MetaAdsError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(status) = self.status {
      write!(f, "Meta Ads error (status {status}): {}", self.message)
    } else {
      write!(f, "Meta Ads error: {}", self.message)
    }
  }
}

impl std::error::Error for MetaAdsError {}

#[derive(Debug, Clone)]
pub struct AccountInfo {
  pub name: Option<String>,
  pub account_id: Option<String>,
  pub currency: Option<String>,
  pub account_status: Option<i64>,
  pub business_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CampaignSummary {
  pub id: String,
  pub name: Option<String>,
  pub status: Option<String>,
  pub objective: Option<String>,
  pub created_time: Option<String>,
}

pub fn build_insights_url(
  base_url: &str,
  api_version: &str,
  account_id: &str,
  date_from: NaiveDate,
  date_to: NaiveDate,
  level: InsightsLevel,
) -> String {
  let base = base_url.trim_end_matches('/');
  // Brackets in time_range[since]/[until] are percent-encoded; hyper rejects
  // them raw in a request target.
  format!(
    "{base}/{api_version}/{account_id}/insights?level={}&fields={INSIGHTS_FIELDS}&time_range%5Bsince%5D={date_from}&time_range%5Buntil%5D={date_to}&time_increment=1&limit=500",
    level.as_str()
  )
}

pub fn build_campaigns_url(base_url: &str, api_version: &str, account_id: &str) -> String {
  let base = base_url.trim_end_matches('/');
  format!("{base}/{api_version}/{account_id}/campaigns?fields={CAMPAIGN_FIELDS}&limit=200")
}

pub fn build_account_url(base_url: &str, api_version: &str, account_id: &str) -> String {
  let base = base_url.trim_end_matches('/');
  format!("{base}/{api_version}/{account_id}?fields={ACCOUNT_FIELDS}")
}

fn graph_error_message(body: &[u8]) -> Option<String> {
  let json = serde_json::from_slice::<Value>(body).ok()?;
  json
    .get("error")?
    .get("message")?
    .as_str()
    .map(str::to_string)
}

async fn fetch_json_by_url(access_token: &str, url: &str) -> Result<Value, MetaAdsError> {
  let connector = hyper_rustls::HttpsConnectorBuilder::new()
    .with_native_roots()
    .map_err(|e| MetaAdsError {
      status: None,
      message: e.to_string(),
    })?
    .https_or_http()
    .enable_http1()
    .build();

  let client =
    hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

  let req = Request::builder()
    .method(Method::GET)
    .uri(url)
    .header(AUTHORIZATION, format!("Bearer {}", access_token))
    .header(ACCEPT, "application/json")
    .body(Empty::<Bytes>::new())
    .map_err(|e| MetaAdsError {
      status: None,
      message: e.to_string(),
    })?;

  let resp = client.request(req).await.map_err(|e| MetaAdsError {
    status: None,
    message: e.to_string(),
  })?;

  let status = resp.status();
  let body_bytes = resp
    .into_body()
    .collect()
    .await
    .map_err(|e| MetaAdsError {
      status: Some(status.as_u16()),
      message: e.to_string(),
    })?
    .to_bytes();

  if status != StatusCode::OK {
    let message = graph_error_message(&body_bytes)
      .unwrap_or_else(|| String::from_utf8_lossy(&body_bytes).chars().take(400).collect());
    return Err(MetaAdsError {
      status: Some(status.as_u16()),
      message,
    });
  }

  serde_json::from_slice::<Value>(&body_bytes).map_err(|e| MetaAdsError {
    status: Some(status.as_u16()),
    message: format!("invalid json response: {e}"),
  })
}

// Collects the `data` arrays of a paged Graph listing, following
// `paging.next` links in order.
async fn fetch_paged_data(access_token: &str, first_url: &str) -> Result<Vec<Value>, MetaAdsError> {
  let mut out: Vec<Value> = Vec::new();
  let mut url = first_url.to_string();

  for page in 0.. {
    if page >= MAX_PAGES {
      log::warn!("stopping after {MAX_PAGES} result pages (paging.next kept going)");
      break;
    }

    let json = fetch_json_by_url(access_token, &url).await?;
    if let Some(rows) = json.get("data").and_then(|v| v.as_array()) {
      out.extend(rows.iter().cloned());
    }

    let next = json
      .get("paging")
      .and_then(|p| p.get("next"))
      .and_then(|v| v.as_str())
      .map(str::to_string);
    match next {
      Some(next) if next != url => url = next,
      _ => break,
    }
  }

  Ok(out)
}

/// Fetches daily insight rows for an inclusive date range. The rows are the
/// platform's loosely-typed report objects; normalization owns all numeric
/// coercion. One call per invocation, no internal retry.
pub async fn fetch_insights_with_base_url(
  access_token: &str,
  base_url: &str,
  api_version: &str,
  account_id: &str,
  date_from: NaiveDate,
  date_to: NaiveDate,
  level: InsightsLevel,
) -> Result<Vec<Value>, MetaAdsError> {
  if date_from > date_to {
    return Err(MetaAdsError {
      status: None,
      message: format!("invalid date range: {date_from} is after {date_to}"),
    });
  }

  let url = build_insights_url(base_url, api_version, account_id, date_from, date_to, level);
  fetch_paged_data(access_token, &url).await
}

pub async fn fetch_insights(
  access_token: &str,
  api_version: &str,
  account_id: &str,
  date_from: NaiveDate,
  date_to: NaiveDate,
  level: InsightsLevel,
) -> Result<Vec<Value>, MetaAdsError> {
  fetch_insights_with_base_url(
    access_token,
    GRAPH_API_BASE_URL,
    api_version,
    account_id,
    date_from,
    date_to,
    level,
  )
  .await
}

pub async fn fetch_campaigns_with_base_url(
  access_token: &str,
  base_url: &str,
  api_version: &str,
  account_id: &str,
) -> Result<Vec<CampaignSummary>, MetaAdsError> {
  let url = build_campaigns_url(base_url, api_version, account_id);
  let rows = fetch_paged_data(access_token, &url).await?;

  let mut out = Vec::with_capacity(rows.len());
  for row in rows {
    let id = row
      .get("id")
      .and_then(|v| v.as_str())
      .unwrap_or("")
      .trim()
      .to_string();
    if id.is_empty() {
      continue;
    }

    let field = |name: &str| {
      row
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::to_string)
    };

    out.push(CampaignSummary {
      id,
      name: field("name"),
      status: field("status"),
      objective: field("objective"),
      created_time: field("created_time"),
    });
  }

  Ok(out)
}

pub async fn fetch_campaigns(
  access_token: &str,
  api_version: &str,
  account_id: &str,
) -> Result<Vec<CampaignSummary>, MetaAdsError> {
  fetch_campaigns_with_base_url(access_token, GRAPH_API_BASE_URL, api_version, account_id).await
}

pub async fn fetch_account_info_with_base_url(
  access_token: &str,
  base_url: &str,
  api_version: &str,
  account_id: &str,
) -> Result<AccountInfo, MetaAdsError> {
  let url = build_account_url(base_url, api_version, account_id);
  let json = fetch_json_by_url(access_token, &url).await?;

  let field = |name: &str| {
    json
      .get(name)
      .and_then(|v| v.as_str())
      .map(str::to_string)
  };

  Ok(AccountInfo {
    name: field("name"),
    account_id: field("account_id"),
    currency: field("currency"),
    account_status: json.get("account_status").and_then(|v| v.as_i64()),
    business_name: field("business_name"),
  })
}

pub async fn fetch_account_info(
  access_token: &str,
  api_version: &str,
  account_id: &str,
) -> Result<AccountInfo, MetaAdsError> {
  fetch_account_info_with_base_url(access_token, GRAPH_API_BASE_URL, api_version, account_id).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use http_body_util::Full;
  use hyper::body::Incoming;
  use hyper::server::conn::http1;
  use hyper::service::service_fn;
  use hyper::{Request, Response, StatusCode};
  use hyper_util::rt::TokioIo;
  use tokio::net::TcpListener;

  fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
  }

  #[test]
  fn build_insights_url_includes_expected_params() {
    let url = build_insights_url(
      "https://graph.facebook.com/",
      DEFAULT_API_VERSION,
      "act_123456789",
      d(2026, 2, 1),
      d(2026, 2, 7),
      InsightsLevel::Campaign,
    );

    assert!(url.contains("/v19.0/act_123456789/insights?"));
    assert!(url.contains("level=campaign"));
    assert!(url.contains("time_range%5Bsince%5D=2026-02-01"));
    assert!(url.contains("time_range%5Buntil%5D=2026-02-07"));
    assert!(url.contains("time_increment=1"));
    assert!(url.contains("fields=campaign_id,campaign_name,date_start"));
  }

  #[test]
  fn build_campaigns_url_includes_expected_fields() {
    let url = build_campaigns_url("https://graph.facebook.com", DEFAULT_API_VERSION, "act_9");
    assert!(url.contains("/v19.0/act_9/campaigns?"));
    assert!(url.contains("fields=id,name,status,objective,created_time"));
  }

  #[test]
  fn insights_level_parses_known_values_only() {
    assert_eq!(InsightsLevel::parse(" Account "), Some(InsightsLevel::Account));
    assert_eq!(InsightsLevel::parse("campaign"), Some(InsightsLevel::Campaign));
    assert_eq!(InsightsLevel::parse("adset"), None);
  }

  #[tokio::test]
  async fn fetch_insights_rejects_inverted_date_range() {
    let err = fetch_insights_with_base_url(
      "token123",
      "http://127.0.0.1:9/",
      DEFAULT_API_VERSION,
      "act_1",
      d(2026, 2, 7),
      d(2026, 2, 1),
      InsightsLevel::Campaign,
    )
    .await
    .unwrap_err();

    assert!(err.status.is_none());
    assert!(err.message.contains("invalid date range"));
  }

  async fn serve_insights_pages(listener: TcpListener, base_url: String, max_connections: usize) {
    for _ in 0..max_connections {
      let (stream, _) = listener.accept().await.unwrap();
      let io = TokioIo::new(stream);
      let base_url = base_url.clone();
      http1::Builder::new()
        .serve_connection(
          io,
          service_fn(move |req: Request<Incoming>| {
            let base_url = base_url.clone();
            async move {
              let query = req.uri().query().unwrap_or("");

              if query.contains("level=campaign") && !query.contains("after=") {
                let body = serde_json::json!({
                  "data": [
                    {
                      "date_start": "2026-02-02",
                      "campaign_id": "c1",
                      "campaign_name": "First",
                      "impressions": "1000",
                      "clicks": "40",
                      "spend": "12.5",
                      "actions": [{"action_type": "lead", "value": "4"}]
                    }
                  ],
                  "paging": {"next": format!("{base_url}page2?level=campaign&after=abc")}
                });
                return Ok::<_, hyper::Error>(
                  Response::builder()
                    .status(StatusCode::OK)
                    .header("content-type", "application/json")
                    .body(Full::new(Bytes::from(body.to_string())))
                    .unwrap(),
                );
              }

              if query.contains("after=abc") {
                let body = serde_json::json!({
                  "data": [
                    {
                      "date_start": "2026-02-03",
                      "campaign_id": "c1",
                      "campaign_name": "First",
                      "impressions": 800,
                      "clicks": 10,
                      "spend": 3.0
                    }
                  ]
                });
                return Ok::<_, hyper::Error>(
                  Response::builder()
                    .status(StatusCode::OK)
                    .header("content-type", "application/json")
                    .body(Full::new(Bytes::from(body.to_string())))
                    .unwrap(),
                );
              }

              Ok::<_, hyper::Error>(
                Response::builder()
                  .status(StatusCode::NOT_FOUND)
                  .body(Full::new(Bytes::from_static(b"not found")))
                  .unwrap(),
              )
            }
          }),
        )
        .await
        .unwrap();
    }
  }

  #[tokio::test]
  async fn fetch_insights_follows_paging_next() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}/", addr);

    let task = tokio::spawn(serve_insights_pages(listener, base_url.clone(), 2));

    let rows = fetch_insights_with_base_url(
      "token123",
      &base_url,
      DEFAULT_API_VERSION,
      "act_1",
      d(2026, 2, 1),
      d(2026, 2, 7),
      InsightsLevel::Campaign,
    )
    .await
    .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("date_start").and_then(|v| v.as_str()), Some("2026-02-02"));
    assert_eq!(rows[1].get("date_start").and_then(|v| v.as_str()), Some("2026-02-03"));

    task.await.unwrap();
  }

  async fn serve_graph_error(listener: TcpListener, max_connections: usize) {
    for _ in 0..max_connections {
      let (stream, _) = listener.accept().await.unwrap();
      let io = TokioIo::new(stream);
      http1::Builder::new()
        .serve_connection(
          io,
          service_fn(|_req: Request<Incoming>| async move {
            let body = r#"{ "error": { "message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190 } }"#;
            Ok::<_, hyper::Error>(
              Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(body)))
                .unwrap(),
            )
          }),
        )
        .await
        .unwrap();
    }
  }

  #[tokio::test]
  async fn fetch_insights_surfaces_graph_error_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}/", addr);

    let task = tokio::spawn(serve_graph_error(listener, 1));

    let err = fetch_insights_with_base_url(
      "bad-token",
      &base_url,
      DEFAULT_API_VERSION,
      "act_1",
      d(2026, 2, 1),
      d(2026, 2, 7),
      InsightsLevel::Account,
    )
    .await
    .unwrap_err();

    assert_eq!(err.status, Some(401));
    assert_eq!(err.message, "Invalid OAuth access token.");

    task.await.unwrap();
  }

  async fn serve_campaigns_and_account(listener: TcpListener, max_connections: usize) {
    for _ in 0..max_connections {
      let (stream, _) = listener.accept().await.unwrap();
      let io = TokioIo::new(stream);
      http1::Builder::new()
        .serve_connection(
          io,
          service_fn(|req: Request<Incoming>| async move {
            let path = req.uri().path();

            if path.ends_with("/campaigns") {
              let body = serde_json::json!({
                "data": [
                  {"id": "c1", "name": "Leads Always On", "status": "ACTIVE", "objective": "OUTCOME_LEADS", "created_time": "2025-11-02T10:00:00+0000"},
                  {"name": "missing id, skipped"},
                  {"id": "c2", "name": "Retargeting", "status": "PAUSED"}
                ]
              });
              return Ok::<_, hyper::Error>(
                Response::builder()
                  .status(StatusCode::OK)
                  .header("content-type", "application/json")
                  .body(Full::new(Bytes::from(body.to_string())))
                  .unwrap(),
              );
            }

            let body = serde_json::json!({
              "name": "Acme Ads",
              "account_id": "123456789",
              "currency": "BRL",
              "account_status": 1
            });
            Ok::<_, hyper::Error>(
              Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .body(Full::new(Bytes::from(body.to_string())))
                .unwrap(),
            )
          }),
        )
        .await
        .unwrap();
    }
  }

  #[tokio::test]
  async fn fetch_campaigns_skips_rows_without_id() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}/", addr);

    let task = tokio::spawn(serve_campaigns_and_account(listener, 1));

    let campaigns = fetch_campaigns_with_base_url("token123", &base_url, DEFAULT_API_VERSION, "act_1")
      .await
      .unwrap();

    assert_eq!(campaigns.len(), 2);
    assert_eq!(campaigns[0].id, "c1");
    assert_eq!(campaigns[0].status.as_deref(), Some("ACTIVE"));
    assert_eq!(campaigns[1].id, "c2");
    assert!(campaigns[1].objective.is_none());

    task.await.unwrap();
  }

  #[tokio::test]
  async fn fetch_account_info_reads_identity_fields() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}/", addr);

    let task = tokio::spawn(serve_campaigns_and_account(listener, 1));

    let info = fetch_account_info_with_base_url("token123", &base_url, DEFAULT_API_VERSION, "act_1")
      .await
      .unwrap();

    assert_eq!(info.name.as_deref(), Some("Acme Ads"));
    assert_eq!(info.currency.as_deref(), Some("BRL"));
    assert_eq!(info.account_status, Some(1));
    assert!(info.business_name.is_none());

    task.await.unwrap();
  }
}
