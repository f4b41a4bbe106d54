//! Google Sheets v4 values API as a [`PriceStore`].

use crate::error::{AuthConfigError, StoreApiError};
use crate::store::auth::{fetch_access_token, AccessToken, ServiceAccountKey, SHEETS_SCOPE};
use crate::store::{cell_to_string, PriceStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Public endpoint of the Sheets API.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Columns A..F hold the six store fields.
const DATA_COLUMNS: &str = "A:F";

/// Error bodies are cut to this many characters in error messages.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    #[serde(default)]
    updates: Option<UpdateStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStats {
    #[serde(default)]
    updated_rows: usize,
}

/// One worksheet of a spreadsheet.
pub struct SheetsStore {
    client: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    worksheet: String,
    token: AccessToken,
}

impl SheetsStore {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        spreadsheet_id: &str,
        worksheet: &str,
        token: AccessToken,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            worksheet: worksheet.to_string(),
            token,
        }
    }

    /// Authenticate as `key` and open `worksheet` of `spreadsheet_id`.
    pub async fn connect(
        key: &ServiceAccountKey,
        api_base: &str,
        spreadsheet_id: &str,
        worksheet: &str,
        timeout: Duration,
    ) -> Result<Self, AuthConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthConfigError::TokenExchange(e.to_string()))?;
        let token = fetch_access_token(&client, key, SHEETS_SCOPE).await?;
        Ok(Self::new(client, api_base, spreadsheet_id, worksheet, token))
    }

    /// A1 range on this worksheet, e.g. `'Galeri24'!A:F`.
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{cells}", self.worksheet.replace('\'', "''"))
    }

    fn values_url(&self, last_segment: &str) -> Result<Url, StoreApiError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| StoreApiError::Decode(format!("invalid API base {}: {e}", self.api_base)))?;
        url.path_segments_mut()
            .map_err(|_| StoreApiError::Decode(format!("API base {} cannot hold a path", self.api_base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", last_segment]);
        Ok(url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let mut message = resp.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| message.is_char_boundary(*i))
                .unwrap_or(0);
            message.truncate(cut);
        }
        Err(StoreApiError::Status {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

#[async_trait]
impl PriceStore for SheetsStore {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, StoreApiError> {
        let url = self.values_url(&self.range(DATA_COLUMNS))?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(StoreApiError::Transport)?;

        let range: ValueRange = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| StoreApiError::Decode(e.to_string()))?;

        debug!(rows = range.values.len(), worksheet = %self.worksheet, "read store");
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_rows(&self, rows: Vec<Vec<Value>>) -> Result<usize, StoreApiError> {
        let range = self.range("A1");
        let mut url = self.values_url(&format!("{range}:append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let count = rows.len();
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(self.token.secret())
            .json(&body)
            .send()
            .await
            .map_err(StoreApiError::Transport)?;

        let appended: AppendResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| StoreApiError::Decode(e.to_string()))?;

        let written = appended.updates.map(|u| u.updated_rows).unwrap_or(count);
        debug!(rows = written, worksheet = %self.worksheet, "appended to store");
        Ok(written)
    }
}
