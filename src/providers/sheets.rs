use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request};
use serde_json::{json, Value};

use crate::insights::MetricRecord;
use crate::metrics::round2;

pub const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Column order for appended rows. A sink that creates its header row from
/// the first write keeps a consistent schema only if this order never
/// changes between calls, so new columns go at the end.
pub const SHEET_HEADERS: [&str; 16] = [
  "date",
  "campaign_id",
  "campaign_name",
  "impressions",
  "clicks",
  "spend",
  "reach",
  "frequency",
  "cpc",
  "cpm",
  "ctr",
  "conversions",
  "leads",
  "platform",
  "cpl",
  "conversion_rate",
];

#[derive(Debug)]
pub struct SheetsError {
  pub status: Option<u16>,
  pub message: String,
}

impl std::fmt::Display for SheetsError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if let Some(status) = self.status {
      write!(f, "Google Sheets error (status {status}): {}", self.message)
    } else {
      write!(f, "Google Sheets error: {}", self.message)
    }
  }
}

impl std::error::Error for SheetsError {}

/// Flattens a record into one sheet row, cell-for-cell aligned with
/// `SHEET_HEADERS`. Absent identity fields become empty cells.
pub fn record_to_row(record: &MetricRecord) -> Vec<Value> {
  vec![
    Value::String(record.date.map(|d| d.to_string()).unwrap_or_default()),
    Value::String(record.campaign_id.clone().unwrap_or_default()),
    Value::String(record.campaign_name.clone().unwrap_or_default()),
    json!(record.impressions),
    json!(record.clicks),
    json!(round2(record.spend)),
    json!(record.reach),
    json!(record.frequency),
    json!(record.cpc),
    json!(record.cpm),
    json!(record.ctr),
    json!(record.conversions),
    json!(record.leads),
    Value::String(record.platform.clone()),
    json!(record.cpl),
    json!(record.conversion_rate),
  ]
}

/// Obtains a spreadsheet-scoped access token for a service account key
/// file, the same credential shape the sheet is shared with.
pub async fn sheets_access_token(credentials_path: &str) -> Result<String, SheetsError> {
  let key = yup_oauth2::read_service_account_key(credentials_path)
    .await
    .map_err(|e| SheetsError {
      status: None,
      message: format!("reading service account key {credentials_path}: {e}"),
    })?;

  let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
    .build()
    .await
    .map_err(|e| SheetsError {
      status: None,
      message: e.to_string(),
    })?;

  let token = auth
    .token(&[SPREADSHEETS_SCOPE])
    .await
    .map_err(|e| SheetsError {
      status: None,
      message: e.to_string(),
    })?;

  token
    .token()
    .map(str::to_string)
    .ok_or_else(|| SheetsError {
      status: None,
      message: "service account token response carried no access token".to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct SheetsClient {
  access_token: String,
  spreadsheet_id: String,
  base_url: String,
}

impl SheetsClient {
  pub fn new(access_token: &str, spreadsheet_id: &str) -> Self {
    Self::with_base_url(access_token, spreadsheet_id, SHEETS_API_BASE_URL)
  }

  pub fn with_base_url(access_token: &str, spreadsheet_id: &str, base_url: &str) -> Self {
    Self {
      access_token: access_token.to_string(),
      spreadsheet_id: spreadsheet_id.to_string(),
      base_url: base_url.trim_end_matches('/').to_string(),
    }
  }

  fn values_url(&self, suffix: &str) -> String {
    format!(
      "{}/v4/spreadsheets/{}/values/{suffix}",
      self.base_url, self.spreadsheet_id
    )
  }

  /// Writes the header row when the tab's first row is empty. Returns true
  /// when the headers were written by this call.
  pub async fn ensure_header_row(&self, tab: &str) -> Result<bool, SheetsError> {
    let url = self.values_url(&format!("{tab}!A1:Z1"));
    let json = self.request_json(Method::GET, &url, None).await?;

    let has_headers = json
      .get("values")
      .and_then(|v| v.as_array())
      .and_then(|rows| rows.first())
      .and_then(|row| row.as_array())
      .map(|cells| !cells.is_empty())
      .unwrap_or(false);
    if has_headers {
      return Ok(false);
    }

    let url = self.values_url(&format!("{tab}!A1?valueInputOption=RAW"));
    let body = json!({ "values": [SHEET_HEADERS] });
    self.request_json(Method::PUT, &url, Some(body)).await?;
    Ok(true)
  }

  /// Appends one row per record at the end of the tab. Returns the number
  /// of rows the sheet reported as appended; an empty batch is a no-op.
  pub async fn append_records(&self, tab: &str, records: &[MetricRecord]) -> Result<usize, SheetsError> {
    if records.is_empty() {
      return Ok(0);
    }

    let rows: Vec<Vec<Value>> = records.iter().map(record_to_row).collect();
    let url = self.values_url(&format!(
      "{tab}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"
    ));
    let body = json!({ "values": rows });

    let json = self.request_json(Method::POST, &url, Some(body)).await?;
    let appended = json
      .get("updates")
      .and_then(|u| u.get("updatedRows"))
      .and_then(|v| v.as_u64())
      .map(|n| n as usize)
      .unwrap_or(records.len());

    Ok(appended)
  }

  async fn request_json(
    &self,
    method: Method,
    url: &str,
    body_json: Option<Value>,
  ) -> Result<Value, SheetsError> {
    let connector = hyper_rustls::HttpsConnectorBuilder::new()
      .with_native_roots()
      .map_err(|e| SheetsError {
        status: None,
        message: e.to_string(),
      })?
      .https_or_http()
      .enable_http1()
      .build();

    let client =
      hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

    let mut builder = Request::builder()
      .method(method)
      .uri(url)
      .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
      .header(ACCEPT, "application/json");

    let body_bytes = match body_json {
      Some(v) => {
        builder = builder.header(CONTENT_TYPE, "application/json");
        serde_json::to_vec(&v).map_err(|e| SheetsError {
          status: None,
          message: e.to_string(),
        })?
      }
      None => Vec::new(),
    };

    let req = builder
      .body(Full::new(Bytes::from(body_bytes)))
      .map_err(|e| SheetsError {
        status: None,
        message: e.to_string(),
      })?;

    let resp = client.request(req).await.map_err(|e| SheetsError {
      status: None,
      message: e.to_string(),
    })?;

    let status = resp.status();
    let body_bytes = resp
      .into_body()
      .collect()
      .await
      .map_err(|e| SheetsError {
        status: Some(status.as_u16()),
        message: e.to_string(),
      })?
      .to_bytes();

    if !status.is_success() {
      let snippet = String::from_utf8_lossy(&body_bytes);
      return Err(SheetsError {
        status: Some(status.as_u16()),
        message: snippet.chars().take(400).collect::<String>(),
      });
    }

    serde_json::from_slice(&body_bytes).map_err(|e| SheetsError {
      status: Some(status.as_u16()),
      message: format!("invalid json response: {e}"),
    })
  }
}
