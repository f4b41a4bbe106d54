//! Timestamp-keyed deduplication and the single append call of a run.

use crate::error::StoreApiError;
use crate::model::PriceRow;
use crate::retry::RetryPolicy;
use crate::store::{PriceStore, STORE_HEADER, TIMESTAMP_COLUMN};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{info, warn};

/// What an append step did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    pub appended: usize,
    /// Incoming rows whose timestamp was already stored.
    pub duplicates: usize,
    /// Whether the header row was written because the store was empty.
    pub wrote_header: bool,
}

/// Append the rows whose timestamp is not already in `store`.
///
/// The store is read once, the timestamp column is located by header name,
/// and every new row goes out in one append call. An empty store gets the
/// header in that same call.
pub async fn append_new_rows(
    store: &dyn PriceStore,
    rows: &[PriceRow],
) -> Result<AppendOutcome, StoreApiError> {
    let existing = store.read_rows().await?;
    let key_column = existing.first().map(|h| timestamp_column(h)).unwrap_or(0);

    let seen: HashSet<&str> = existing
        .iter()
        .filter_map(|row| row.get(key_column))
        .map(String::as_str)
        .collect();

    let fresh: Vec<&PriceRow> = rows
        .iter()
        .filter(|r| !seen.contains(r.timestamp()))
        .collect();
    let duplicates = rows.len() - fresh.len();

    if fresh.is_empty() {
        info!(duplicates, "all rows already stored, nothing to append");
        return Ok(AppendOutcome {
            appended: 0,
            duplicates,
            wrote_header: false,
        });
    }

    let wrote_header = existing.is_empty();
    let mut values: Vec<Vec<Value>> = Vec::with_capacity(fresh.len() + 1);
    if wrote_header {
        values.push(STORE_HEADER.iter().map(|h| json!(h)).collect());
    }
    values.extend(fresh.iter().map(|r| r.to_values()));

    store.append_rows(values).await?;
    info!(
        appended = fresh.len(),
        duplicates,
        wrote_header,
        "appended rows"
    );

    Ok(AppendOutcome {
        appended: fresh.len(),
        duplicates,
        wrote_header,
    })
}

/// [`append_new_rows`] under a retry policy. Each attempt re-reads the store,
/// so rows written by an attempt that reported failure are not appended twice.
pub async fn append_with_retry(
    store: &dyn PriceStore,
    rows: &[PriceRow],
    policy: &RetryPolicy,
) -> Result<AppendOutcome, StoreApiError> {
    policy
        .run("store append", || append_new_rows(store, rows))
        .await
}

fn timestamp_column(header: &[String]) -> usize {
    match header.iter().position(|h| h.trim() == TIMESTAMP_COLUMN) {
        Some(idx) => idx,
        None => {
            warn!(
                ?header,
                "header has no {TIMESTAMP_COLUMN} column, using the first column"
            );
            0
        }
    }
}
