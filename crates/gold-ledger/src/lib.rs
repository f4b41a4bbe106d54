//! Gold Ledger: scrape Galeri24 gold prices and append them to a
//! Google Sheets ledger, once per run, without duplicating a run.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod model;
pub mod pipeline;
pub mod retry;
pub mod store;
