//! Extraction: markup to sections to raw rows to validated price rows.

pub mod currency;
pub mod normalize;
pub mod sections;
