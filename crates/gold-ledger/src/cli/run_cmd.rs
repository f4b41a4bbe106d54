//! `gold-ledger run`: scrape the page and append new rows to the ledger.

use crate::cli::output::{self, Styled};
use crate::config::Config;
use crate::pipeline::{Pipeline, RunReport};
use crate::store::auth::ServiceAccountKey;
use crate::store::memory::MemoryStore;
use crate::store::sheets::SheetsStore;
use anyhow::{Context, Result};

/// Run the full pipeline. `dry_run` swaps the sheet for an in-memory store.
pub async fn run(config: Config, dry_run: bool) -> Result<()> {
    let pipeline = Pipeline::new(config)?;

    let mut preview = Vec::new();
    let report = if dry_run {
        let outcome = pipeline.scrape().await?;
        preview = outcome.rows.clone();
        pipeline.commit(outcome, &MemoryStore::with_header()).await?
    } else {
        // Read credentials first so a misconfigured job fails before any request.
        let sheet = &pipeline.config().sheet;
        let key = ServiceAccountKey::from_env(&sheet.credentials_env)?;
        let outcome = pipeline.scrape().await?;
        let store = SheetsStore::connect(
            &key,
            &sheet.api_base,
            &sheet.spreadsheet_id,
            &sheet.worksheet,
            pipeline.config().timeout,
        )
        .await
        .with_context(|| format!("connecting to spreadsheet {}", sheet.spreadsheet_id))?;
        pipeline.commit(outcome, &store).await?
    };

    if output::is_json() {
        let mut value = serde_json::to_value(&report)?;
        value["dry_run"] = serde_json::Value::Bool(dry_run);
        if dry_run {
            value["rows"] = serde_json::to_value(&preview)?;
        }
        output::print_json(&value);
        return Ok(());
    }

    if !output::is_quiet() {
        if dry_run {
            print!("{}", output::rows_table(&preview));
            eprintln!();
        }
        print_report(&Styled::new(), &report, dry_run);
    }
    Ok(())
}

fn print_report(s: &Styled, report: &RunReport, dry_run: bool) {
    output::print_header(s);

    output::print_check(s.info_sym(), "Run", &report.timestamp_local);
    output::print_check(s.ok_sym(), "Sections", &report.sections.join(", "));
    if report.failed_sections > 0 {
        output::print_check(
            s.warn_sym(),
            "Failed sections",
            &s.yellow(&report.failed_sections.to_string()),
        );
    }
    output::print_check(
        s.ok_sym(),
        "Rows",
        &format!(
            "{} valid of {} extracted",
            report.valid,
            report.extracted + report.skipped
        ),
    );
    if report.skipped + report.dropped > 0 {
        output::print_check(
            s.warn_sym(),
            "Skipped",
            &format!("{} malformed, {} unparseable", report.skipped, report.dropped),
        );
    }
    if report.wrote_header {
        output::print_check(s.info_sym(), "Header", "written to empty store");
    }
    output::print_check(
        s.ok_sym(),
        "Appended",
        &format!("{} new, {} already stored", report.appended, report.duplicates),
    );

    let target = if dry_run { "dry run" } else { "sheet updated" };
    output::print_status(s, &s.green("done"), target);
}
