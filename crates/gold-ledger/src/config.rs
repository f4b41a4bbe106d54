//! Run configuration, assembled once at process start.

use crate::acquisition::http_client::DEFAULT_USER_AGENT;
use crate::extraction::normalize::DEFAULT_MIN_ROWS;
use crate::extraction::sections::{DEFAULT_BRANDS, DEFAULT_ROW_CLASS};
use crate::retry::RetryPolicy;
use crate::store::auth::CREDENTIALS_ENV;
use crate::store::sheets::SHEETS_API_BASE;
use std::time::Duration;

/// Page carrying the Galeri24 price tables.
pub const DEFAULT_URL: &str = "https://www.ecorp.galeri24.co.id/harga-emas";
pub const DEFAULT_SHEET_ID: &str = "1wBU6Tqyv-FI2Vp3unGo_jObz9RMabgSJu1X7ztzauO4";
pub const DEFAULT_WORKSHEET: &str = "Galeri24";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where rows are persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub api_base: String,
    /// Environment variable holding the service-account JSON.
    pub credentials_env: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: DEFAULT_SHEET_ID.to_string(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            api_base: SHEETS_API_BASE.to_string(),
            credentials_env: CREDENTIALS_ENV.to_string(),
        }
    }
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub user_agent: String,
    /// Per-request timeout, for both the page fetch and store calls.
    pub timeout: Duration,
    /// Brand allow-list; sections with other ids are ignored.
    pub brands: Vec<String>,
    pub row_class: String,
    pub min_rows: usize,
    pub sheet: SheetConfig,
    pub fetch_retry: RetryPolicy,
    pub store_retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            brands: DEFAULT_BRANDS.iter().map(|b| b.to_string()).collect(),
            row_class: DEFAULT_ROW_CLASS.to_string(),
            min_rows: DEFAULT_MIN_ROWS,
            sheet: SheetConfig::default(),
            fetch_retry: RetryPolicy::http_fetch(),
            store_retry: RetryPolicy::store_api(),
        }
    }
}

impl Config {
    /// Replace the brand allow-list, ignoring blank entries. An empty list keeps the defaults.
    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let brands: Vec<String> = brands
            .into_iter()
            .map(|b| b.as_ref().trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
        if !brands.is_empty() {
            self.brands = brands;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.brands.len(), 5);
        assert_eq!(config.min_rows, 3);
        assert_eq!(config.sheet.worksheet, "Galeri24");
        assert_eq!(config.sheet.credentials_env, "GCP_SERVICE_ACCOUNT_JSON");
        assert_eq!(config.fetch_retry.max_attempts, 4);
        assert_eq!(config.store_retry.max_attempts, 5);
    }

    #[test]
    fn test_with_brands() {
        let config = Config::default().with_brands([" ANTAM ", "", "UBS"]);
        assert_eq!(config.brands, vec!["ANTAM", "UBS"]);

        let unchanged = Config::default().with_brands(Vec::<String>::new());
        assert_eq!(unchanged.brands.len(), 5);
    }
}
