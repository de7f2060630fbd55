//! Sheets v4 REST client

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::backend::SheetsBackend;
use super::constants::{INSERT_DATA_OPTION, METADATA_FIELDS, VALUE_INPUT_OPTION};
use super::error::BackendError;
use super::models::{
    AppendValuesResponse, ApiErrorEnvelope, RawSpreadsheet, SpreadsheetMetadata,
    UpdateValuesResponse, ValueRange, WriteKind, WriteReceipt,
};

/// Credentials attached to every request.
///
/// Token acquisition (service account JWT exchange, gcloud, workload identity)
/// happens outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetsAuth {
    /// OAuth2 bearer token with the spreadsheets scope
    pub access_token: Option<String>,
    /// API key; only sufficient for reading public spreadsheets
    pub api_key: Option<String>,
}

/// HTTP client bound to a single spreadsheet
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    auth: SheetsAuth,
}

impl GoogleSheetsClient {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        auth: SheetsAuth,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sheetstore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            auth,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn spreadsheet_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id)
        )
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(range))
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.auth.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &self.auth.api_key {
            builder = builder.query(&[("key", key)]);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, BackendError> {
        let response = builder.send().await?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::malformed(format!("Failed to decode response: {}", e)))
    }
}

/// Turn a non-2xx response into a classified [`BackendError`]
async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(kind) => format!("{} ({})", envelope.error.message, kind),
            None => envelope.error.message,
        },
        Err(_) if body.is_empty() => status.canonical_reason().unwrap_or("unknown").to_string(),
        Err(_) => body,
    };

    Err(BackendError::from_status(status.as_u16(), message))
}

#[async_trait]
impl SheetsBackend for GoogleSheetsClient {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, BackendError> {
        debug!("GET values {}", range);
        let value_range: ValueRange = self
            .send(self.request(Method::GET, self.values_url(range)))
            .await?;
        Ok(value_range.into_grid())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError> {
        debug!("POST append {} ({} cells)", range, row.len());
        let url = format!("{}:append", self.values_url(range));
        let builder = self
            .request(Method::POST, url)
            .query(&[
                ("valueInputOption", VALUE_INPUT_OPTION),
                ("insertDataOption", INSERT_DATA_OPTION),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }));

        let response: AppendValuesResponse = self.send(builder).await?;
        let updates = response.updates.unwrap_or_default();
        Ok(WriteReceipt::new(
            WriteKind::Append,
            updates.updated_range.or(response.table_range),
            updates.updated_rows.unwrap_or(0),
            updates.updated_cells.unwrap_or(0),
        ))
    }

    async fn update_row(&self, range: &str, row: Vec<String>) -> Result<WriteReceipt, BackendError> {
        debug!("PUT values {} ({} cells)", range, row.len());
        let builder = self
            .request(Method::PUT, self.values_url(range))
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": [row] }));

        let response: UpdateValuesResponse = self.send(builder).await?;
        Ok(WriteReceipt::new(
            WriteKind::Update,
            response.updated_range,
            response.updated_rows.unwrap_or(0),
            response.updated_cells.unwrap_or(0),
        ))
    }

    async fn delete_rows(
        &self,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> Result<WriteReceipt, BackendError> {
        debug!("POST batchUpdate deleteDimension sheet {} rows [{}, {})", sheet_id, start, end);
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end
                    }
                }
            }]
        });

        let _: serde_json::Value = self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(WriteReceipt::new(
            WriteKind::DeleteRows,
            None,
            end.saturating_sub(start) as u32,
            0,
        ))
    }

    async fn metadata(&self) -> Result<SpreadsheetMetadata, BackendError> {
        debug!("GET spreadsheet metadata {}", self.spreadsheet_id);
        let builder = self
            .request(Method::GET, self.spreadsheet_url())
            .query(&[("fields", METADATA_FIELDS)]);
        let raw: RawSpreadsheet = self.send(builder).await?;
        Ok(raw.into())
    }
}
