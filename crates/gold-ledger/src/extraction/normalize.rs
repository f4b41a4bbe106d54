//! Raw rows to validated [`PriceRow`]s.

use crate::error::PipelineError;
use crate::extraction::currency::parse_currency;
use crate::model::{PriceRow, RawRow, RunTimestamp};
use tracing::{debug, info};

/// Fewest rows a run may produce before it is treated as a partial page load.
pub const DEFAULT_MIN_ROWS: usize = 3;

/// Output of [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub rows: Vec<PriceRow>,
    /// Rows dropped because a price did not parse.
    pub dropped: usize,
}

/// Parse both prices of every row and stamp survivors with the run timestamp.
pub fn normalize(raw: Vec<RawRow>, stamp: &RunTimestamp) -> Normalized {
    let total = raw.len();
    let mut rows = Vec::with_capacity(total);

    for r in raw {
        match (parse_currency(&r.sell), parse_currency(&r.buyback)) {
            (Some(sell), Some(buyback)) => {
                rows.push(PriceRow::new(stamp, r.brand, r.weight, sell, buyback));
            }
            _ => debug!(
                brand = %r.brand,
                weight = %r.weight,
                sell = %r.sell,
                buyback = %r.buyback,
                "dropping row with unparseable price"
            ),
        }
    }

    let dropped = total - rows.len();
    info!(
        parsed = total,
        dropped,
        timestamp = stamp.iso(),
        "normalized price rows"
    );
    Normalized { rows, dropped }
}

/// Reject a run that produced fewer than `min` rows.
pub fn ensure_min_rows(rows: &[PriceRow], min: usize) -> Result<(), PipelineError> {
    if rows.len() < min {
        return Err(PipelineError::InsufficientData {
            found: rows.len(),
            required: min,
        });
    }
    Ok(())
}
