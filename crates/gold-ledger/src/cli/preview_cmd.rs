//! `gold-ledger preview`: scrape and print rows without writing anywhere.

use crate::cli::output::{self, Styled};
use crate::config::Config;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the preview command.
pub async fn run(config: Config) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    let outcome = pipeline.scrape().await?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "timestamp": outcome.timestamp.iso(),
            "timestamp_local": outcome.timestamp.local(),
            "sections": outcome.sections_found,
            "failed_sections": outcome.failed_sections,
            "rows": outcome.rows,
        }));
        return Ok(());
    }

    if output::is_quiet() {
        return Ok(());
    }

    let s = Styled::new();
    output::print_header(&s);
    eprintln!(
        "  {} {}",
        s.bold("Prices at"),
        s.dim(outcome.timestamp.local())
    );
    eprintln!();
    print!("{}", output::rows_table(&outcome.rows));

    if output::is_verbose() {
        eprintln!();
        output::print_check(s.info_sym(), "Sections", &outcome.sections_found.join(", "));
        output::print_check(
            s.info_sym(),
            "Skipped",
            &format!("{} malformed, {} unparseable", outcome.skipped, outcome.dropped),
        );
    }

    output::print_status(
        &s,
        &s.green("ok"),
        &format!("{} rows, not stored", outcome.rows.len()),
    );
    Ok(())
}
