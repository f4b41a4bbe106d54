//! Command-line interface for the `gold-ledger` binary.

pub mod output;
pub mod preview_cmd;
pub mod run_cmd;

use crate::config::{Config, SheetConfig, DEFAULT_SHEET_ID, DEFAULT_TIMEOUT_SECS, DEFAULT_URL, DEFAULT_WORKSHEET};
use crate::extraction::normalize::DEFAULT_MIN_ROWS;
use crate::extraction::sections::DEFAULT_ROW_CLASS;
use crate::store::auth::CREDENTIALS_ENV;
use crate::store::sheets::SHEETS_API_BASE;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// Record Galeri24 gold prices into a Google Sheets ledger.
#[derive(Debug, Parser)]
#[command(name = "gold-ledger", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print machine-readable JSON to stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Only print errors.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Debug-level logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scrape the page and append new rows to the sheet (default).
    Run {
        /// Append into an in-memory store instead of the sheet.
        #[arg(long)]
        dry_run: bool,
    },
    /// Scrape and print the rows without touching the store.
    Preview,
}

/// Run settings; every flag falls back to an environment variable.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Page to scrape.
    #[arg(long, env = "GOLD_LEDGER_URL", default_value = DEFAULT_URL, global = true)]
    pub url: String,

    /// Spreadsheet ID of the ledger.
    #[arg(long, env = "GOLD_LEDGER_SHEET_ID", default_value = DEFAULT_SHEET_ID, global = true)]
    pub sheet_id: String,

    /// Worksheet (tab) name.
    #[arg(long, env = "GOLD_LEDGER_WORKSHEET", default_value = DEFAULT_WORKSHEET, global = true)]
    pub worksheet: String,

    /// Brand section to read; repeat or comma-separate. Defaults to all known brands.
    #[arg(long = "brand", env = "GOLD_LEDGER_BRANDS", value_delimiter = ',', global = true)]
    pub brands: Vec<String>,

    /// Class that marks a price row.
    #[arg(long, env = "GOLD_LEDGER_ROW_CLASS", default_value = DEFAULT_ROW_CLASS, global = true)]
    pub row_class: String,

    /// Fail the run when fewer rows than this survive parsing.
    #[arg(long, env = "GOLD_LEDGER_MIN_ROWS", default_value_t = DEFAULT_MIN_ROWS, global = true)]
    pub min_rows: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "GOLD_LEDGER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_secs: u64,

    /// Base URL of the Sheets API.
    #[arg(long, env = "GOLD_LEDGER_SHEETS_API", default_value = SHEETS_API_BASE, hide = true, global = true)]
    pub sheets_api: String,

    /// Environment variable that holds the service-account JSON.
    #[arg(long, default_value = CREDENTIALS_ENV, global = true)]
    pub credentials_env: String,
}

impl ConfigArgs {
    pub fn into_config(self) -> Config {
        Config {
            url: self.url,
            timeout: Duration::from_secs(self.timeout_secs),
            row_class: self.row_class,
            min_rows: self.min_rows,
            sheet: SheetConfig {
                spreadsheet_id: self.sheet_id,
                worksheet: self.worksheet,
                api_base: self.sheets_api,
                credentials_env: self.credentials_env,
            },
            ..Config::default()
        }
        .with_brands(self.brands)
    }
}

impl Cli {
    /// Publish output flags for the `output` helpers.
    pub fn apply_output_flags(&self) {
        if self.json {
            std::env::set_var(output::JSON_ENV, "1");
        }
        if self.quiet {
            std::env::set_var(output::QUIET_ENV, "1");
        }
        if self.verbose {
            std::env::set_var(output::VERBOSE_ENV, "1");
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr.
pub fn init_tracing(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        "gold_ledger=debug"
    } else if cli.quiet {
        "gold_ledger=warn"
    } else {
        "gold_ledger=info"
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Dispatch the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let command = cli.command.clone().unwrap_or(Command::Run { dry_run: false });
    let config = cli.config.into_config();

    match command {
        Command::Run { dry_run } => run_cmd::run(config, dry_run).await,
        Command::Preview => preview_cmd::run(config).await,
    }
}
