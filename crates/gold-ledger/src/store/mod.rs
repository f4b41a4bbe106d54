//! Persisted price history: the store abstraction and its implementations.

pub mod auth;
pub mod dedup;
pub mod memory;
pub mod sheets;

use crate::error::StoreApiError;
use async_trait::async_trait;
use serde_json::Value;

/// Header row of the persisted store.
pub const STORE_HEADER: [&str; 6] = [
    "timestamp",
    "timestamp_local",
    "brand",
    "weight",
    "harga_jual",
    "harga_buyback",
];

/// Name of the dedup key column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// An append-only table of rows with a header.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Every row currently stored, header included, rendered as strings.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, StoreApiError>;

    /// Append rows after the last non-empty row. Returns the number of rows written.
    async fn append_rows(&self, rows: Vec<Vec<Value>>) -> Result<usize, StoreApiError>;
}

/// Render a cell as the store would display it.
pub(crate) fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
