//! Row types flowing through the pipeline.

use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

/// UTC+7 (WIB), the page's local time.
pub const LOCAL_OFFSET_SECS: i32 = 7 * 3600;

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The single instant shared by every row of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTimestamp {
    utc: DateTime<Utc>,
    iso: String,
    local: String,
}

impl RunTimestamp {
    /// Capture the current instant.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(utc: DateTime<Utc>) -> Self {
        let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        Self {
            utc,
            iso: utc.to_rfc3339_opts(SecondsFormat::Micros, false),
            local: utc.with_timezone(&offset).format(LOCAL_FORMAT).to_string(),
        }
    }

    pub fn utc(&self) -> DateTime<Utc> {
        self.utc
    }

    /// RFC 3339 rendering, e.g. `2026-10-19T03:15:42.123456+00:00`. Used as the dedup key.
    pub fn iso(&self) -> &str {
        &self.iso
    }

    /// Wall-clock rendering in UTC+7.
    pub fn local(&self) -> &str {
        &self.local
    }
}

/// A row as it appears on the page: exactly three populated cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub brand: String,
    pub weight: String,
    pub sell: String,
    pub buyback: String,
}

impl RawRow {
    /// Build a row from cell texts. `None` unless there are exactly three.
    pub fn from_cells(brand: &str, cells: &[String]) -> Option<Self> {
        match cells {
            [weight, sell, buyback] => Some(Self {
                brand: brand.to_string(),
                weight: weight.clone(),
                sell: sell.clone(),
                buyback: buyback.clone(),
            }),
            _ => None,
        }
    }
}

/// A validated price quote, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    timestamp: String,
    timestamp_local: String,
    brand: String,
    weight: String,
    sell_price: i64,
    buyback_price: i64,
}

impl PriceRow {
    pub(crate) fn new(
        stamp: &RunTimestamp,
        brand: String,
        weight: String,
        sell_price: i64,
        buyback_price: i64,
    ) -> Self {
        Self {
            timestamp: stamp.iso().to_string(),
            timestamp_local: stamp.local().to_string(),
            brand,
            weight,
            sell_price,
            buyback_price,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn timestamp_local(&self) -> &str {
        &self.timestamp_local
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn weight(&self) -> &str {
        &self.weight
    }

    pub fn sell_price(&self) -> i64 {
        self.sell_price
    }

    pub fn buyback_price(&self) -> i64 {
        self.buyback_price
    }

    /// Cell values in store column order.
    pub fn to_values(&self) -> Vec<Value> {
        vec![
            json!(self.timestamp),
            json!(self.timestamp_local),
            json!(self.brand),
            json!(self.weight),
            json!(self.sell_price),
            json!(self.buyback_price),
        ]
    }
}
