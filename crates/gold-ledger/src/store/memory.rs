//! In-process store used for dry runs and tests.

use crate::error::StoreApiError;
use crate::store::{cell_to_string, PriceStore, STORE_HEADER};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

/// A [`PriceStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Vec<String>>>,
}

impl MemoryStore {
    /// An empty store with no header row.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already carries the header row.
    pub fn with_header() -> Self {
        let header = STORE_HEADER.iter().map(|h| h.to_string()).collect();
        Self {
            rows: Mutex::new(vec![header]),
        }
    }

    /// Copy of every stored row.
    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<String>>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, StoreApiError> {
        Ok(self.snapshot())
    }

    async fn append_rows(&self, rows: Vec<Vec<Value>>) -> Result<usize, StoreApiError> {
        let count = rows.len();
        let mut stored = self.lock();
        stored.extend(
            rows.iter()
                .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>()),
        );
        Ok(count)
    }
}
