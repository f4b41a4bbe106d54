//! Brand section discovery and row extraction.
//!
//! Sections are located by their `id` attribute, normalized for case and
//! whitespace and matched against the brand allow-list. When no id matches,
//! `h2`-`h4` headings carrying a brand name are tried instead and the
//! heading's next sibling `div` (or its parent) is taken as the section.
//!
//! Rows are direct children of the section that carry the row class
//! signature. A row's cells are its direct child elements with non-empty
//! text; only rows with exactly three such cells are kept.

use crate::error::{NoSectionsFound, SectionParseError};
use crate::model::RawRow;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Brand identifiers published on the page.
pub const DEFAULT_BRANDS: &[&str] = &[
    "GALERI 24",
    "ANTAM",
    "Dinar G24",
    "ANTAM NON PEGADAIAN",
    "UBS",
];

/// Class carried by every price row (the 5-column grid).
pub const DEFAULT_ROW_CLASS: &str = "grid-cols-5";

static ID_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[id]").unwrap());
static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3, h4").unwrap());

/// A matched brand region of the document.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    /// Canonical brand name from the allow-list.
    pub brand: String,
    pub element: ElementRef<'a>,
}

/// Everything pulled out of one page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rows: Vec<RawRow>,
    /// Brands whose section was found, in document order.
    pub sections_found: Vec<String>,
    /// Sections that were found but yielded nothing.
    pub failures: Vec<SectionParseError>,
    /// Rows skipped for not having exactly three cells.
    pub skipped_rows: usize,
    pub warning: Option<NoSectionsFound>,
}

/// Extracts raw price rows for an allow-list of brands.
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    brands: Vec<String>,
    row_class: String,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self::new(
            DEFAULT_BRANDS.iter().map(|b| b.to_string()).collect(),
            DEFAULT_ROW_CLASS,
        )
    }
}

impl SectionExtractor {
    pub fn new(brands: Vec<String>, row_class: &str) -> Self {
        Self {
            brands,
            row_class: row_class.to_string(),
        }
    }

    /// Parse `html` and pull rows from every matched section.
    ///
    /// Never fails as a whole: a section that yields nothing is recorded in
    /// [`Extraction::failures`] and the remaining sections are still read.
    pub fn extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);
        let mut out = Extraction::default();

        let mut sections = self.find_by_id(&document);
        if sections.is_empty() {
            sections = self.find_by_heading(&document);
            if !sections.is_empty() {
                debug!(count = sections.len(), "located sections by heading text");
            }
        }

        if sections.is_empty() {
            warn!("{}", NoSectionsFound);
            out.warning = Some(NoSectionsFound);
            return out;
        }

        for section in &sections {
            out.sections_found.push(section.brand.clone());
            match self.extract_section(section) {
                Ok((mut rows, skipped)) => {
                    debug!(brand = %section.brand, rows = rows.len(), skipped, "parsed section");
                    out.skipped_rows += skipped;
                    out.rows.append(&mut rows);
                }
                Err(e) => {
                    warn!(brand = %section.brand, error = %e, "failed to parse section");
                    out.failures.push(e);
                }
            }
        }

        info!(
            sections = out.sections_found.len(),
            failed_sections = out.failures.len(),
            rows = out.rows.len(),
            skipped_rows = out.skipped_rows,
            "extracted price rows"
        );
        out
    }

    /// Allow-list spelling for `raw`, if it names a known brand.
    fn canonical_brand(&self, raw: &str) -> Option<&str> {
        let key = normalize_key(raw);
        self.brands
            .iter()
            .find(|b| normalize_key(b) == key)
            .map(String::as_str)
    }

    fn find_by_id<'a>(&self, document: &'a Html) -> Vec<Section<'a>> {
        let mut sections: Vec<Section<'a>> = Vec::new();
        for el in document.select(&ID_SEL) {
            let Some(id) = el.value().attr("id") else {
                continue;
            };
            let Some(brand) = self.canonical_brand(id) else {
                continue;
            };
            // First occurrence of a brand wins.
            if sections.iter().any(|s| s.brand == brand) {
                continue;
            }
            sections.push(Section {
                brand: brand.to_string(),
                element: el,
            });
        }
        sections
    }

    fn find_by_heading<'a>(&self, document: &'a Html) -> Vec<Section<'a>> {
        let mut sections: Vec<Section<'a>> = Vec::new();
        for heading in document.select(&HEADING_SEL) {
            let Some(brand) = self.canonical_brand(&element_text(&heading)) else {
                continue;
            };
            if sections.iter().any(|s| s.brand == brand) {
                continue;
            }
            let container = heading
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "div")
                .or_else(|| heading.parent().and_then(ElementRef::wrap));
            if let Some(element) = container {
                sections.push(Section {
                    brand: brand.to_string(),
                    element,
                });
            }
        }
        sections
    }

    /// Rows of one section, plus the number of grid rows skipped for shape.
    fn extract_section(
        &self,
        section: &Section<'_>,
    ) -> Result<(Vec<RawRow>, usize), SectionParseError> {
        let grid_rows: Vec<ElementRef<'_>> = child_elements(section.element)
            .filter(|el| el.value().classes().any(|c| c == self.row_class))
            .collect();

        if grid_rows.is_empty() {
            return Err(SectionParseError::NoRows {
                brand: section.brand.clone(),
                signature: self.row_class.clone(),
            });
        }

        let mut rows = Vec::new();
        let mut skipped = 0;
        for row in grid_rows {
            let cells: Vec<String> = child_elements(row)
                .map(|cell| element_text(&cell))
                .filter(|text| !text.is_empty())
                .collect();
            match RawRow::from_cells(&section.brand, &cells) {
                Some(raw) => rows.push(raw),
                None => skipped += 1,
            }
        }
        Ok((rows, skipped))
    }
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Visible text with whitespace collapsed.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case- and whitespace-insensitive comparison key.
fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> String {
        let inner: String = cells
            .iter()
            .map(|c| format!(r#"<div class="p-3">{c}</div>"#))
            .collect();
        format!(r#"<div class="grid grid-cols-5 divide-x">{inner}</div>"#)
    }

    fn section(id: &str, rows: &[String]) -> String {
        format!(
            r#"<div id="{id}"><div class="text-lg">Harga {id}</div>{}</div>"#,
            rows.concat()
        )
    }

    #[test]
    fn test_valid_row_per_section() {
        let valid = row(&["1 gram", "Rp 1.000.000", "Rp 950.000"]);
        let html = format!(
            "<html><body>{}{}</body></html>",
            section("GALERI 24", &[valid.clone()]),
            section("ANTAM", &[valid])
        );

        let out = SectionExtractor::default().extract(&html);
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].brand, "GALERI 24");
        assert_eq!(out.rows[0].weight, "1 gram");
        assert_eq!(out.rows[0].sell, "Rp 1.000.000");
        assert_eq!(out.rows[0].buyback, "Rp 950.000");
        assert_eq!(out.rows[1].brand, "ANTAM");
        assert!(out.warning.is_none());
    }

    #[test]
    fn test_two_cell_row_skipped() {
        let html = section(
            "UBS",
            &[
                row(&["1 gram", "Rp 1.000.000"]),
                row(&["2 gram", "Rp 2.000.000", "Rp 1.900.000"]),
            ],
        );

        let out = SectionExtractor::default().extract(&html);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].weight, "2 gram");
        assert_eq!(out.skipped_rows, 1);
    }

    #[test]
    fn test_empty_cells_do_not_count() {
        let html = section(
            "ANTAM",
            &[row(&["1 gram", "Rp 1.000.000", "", "Rp 950.000", " "])],
        );

        let out = SectionExtractor::default().extract(&html);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].buyback, "Rp 950.000");
    }

    #[test]
    fn test_rows_without_signature_ignored() {
        let html = r#"<div id="ANTAM">
            <div class="flex"><div>1 gram</div><div>Rp 1</div><div>Rp 2</div></div>
            <div class="grid grid-cols-5"><div>2 gram</div><div>Rp 3</div><div>Rp 4</div></div>
        </div>"#;

        let out = SectionExtractor::default().extract(html);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].weight, "2 gram");
        assert_eq!(out.skipped_rows, 0);
    }

    #[test]
    fn test_id_matching_normalizes_case_and_whitespace() {
        let html = section("  dinar   g24 ", &[row(&["1 dinar", "Rp 4.000.000", "Rp 3.800.000"])]);

        let out = SectionExtractor::default().extract(&html);
        assert_eq!(out.sections_found, vec!["Dinar G24".to_string()]);
        assert_eq!(out.rows[0].brand, "Dinar G24");
    }

    #[test]
    fn test_unknown_sections_ignored() {
        let html = section("LOTUS ARCHI", &[row(&["1 gram", "Rp 1", "Rp 2"])]);

        let out = SectionExtractor::default().extract(&html);
        assert!(out.rows.is_empty());
        assert_eq!(out.warning, Some(NoSectionsFound));
    }

    #[test]
    fn test_no_sections_warns() {
        let out = SectionExtractor::default().extract("<html><body><p>maintenance</p></body></html>");
        assert!(out.rows.is_empty());
        assert!(out.sections_found.is_empty());
        assert_eq!(out.warning, Some(NoSectionsFound));
    }

    #[test]
    fn test_failing_section_does_not_block_others() {
        let valid = row(&["1 gram", "Rp 1.000.000", "Rp 950.000"]);
        let html = format!(
            "{}{}{}{}{}",
            section("GALERI 24", &[valid.clone()]),
            section("ANTAM", &[valid.clone()]),
            section("Dinar G24", &[valid.clone()]),
            section("ANTAM NON PEGADAIAN", &[valid]),
            r#"<div id="UBS"><p>Harga belum tersedia</p></div>"#,
        );

        let out = SectionExtractor::default().extract(&html);
        assert_eq!(out.sections_found.len(), 5);
        assert_eq!(out.rows.len(), 4);
        assert_eq!(
            out.failures,
            vec![SectionParseError::NoRows {
                brand: "UBS".into(),
                signature: DEFAULT_ROW_CLASS.into(),
            }]
        );
        assert!(!out.rows.iter().any(|r| r.brand == "UBS"));
    }

    #[test]
    fn test_heading_fallback() {
        let html = format!(
            "<section><h3>Galeri 24</h3><div>{}</div></section>",
            row(&["1 gram", "Rp 1.000.000", "Rp 950.000"])
        );

        let out = SectionExtractor::default().extract(&html);
        assert_eq!(out.sections_found, vec!["GALERI 24".to_string()]);
        assert_eq!(out.rows.len(), 1);
    }

    #[test]
    fn test_custom_brand_list() {
        let html = format!(
            "{}{}",
            section("ANTAM", &[row(&["1 gram", "Rp 1", "Rp 2"])]),
            section("UBS", &[row(&["1 gram", "Rp 3", "Rp 4"])])
        );

        let extractor = SectionExtractor::new(vec!["UBS".into()], DEFAULT_ROW_CLASS);
        let out = extractor.extract(&html);
        assert_eq!(out.sections_found, vec!["UBS".to_string()]);
        assert_eq!(out.rows.len(), 1);
    }
}
