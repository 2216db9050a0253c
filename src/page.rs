//! Reading display fields out of page markup.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use beacon_core::{BindingTable, FieldBoard};
use scraper::{Html, Selector};

/// Which bound selectors a page provides.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PageScan {
    /// Selector and the initial text of its first match, in table order.
    pub present: Vec<(&'static str, String)>,
    /// Bound selectors with no matching element.
    pub missing: Vec<&'static str>,
}

impl PageScan {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// A board holding only the fields the page has, seeded with their text.
    pub fn to_board(&self) -> FieldBoard {
        let mut board = FieldBoard::new();
        for (selector, text) in &self.present {
            board.insert(*selector, text.clone());
        }
        board
    }
}

/// Match every selector in `table` against `html`.
pub fn scan_page(html: &str, table: &BindingTable) -> Result<PageScan> {
    let document = Html::parse_document(html);
    let mut scan = PageScan::default();

    for selector in table.selectors() {
        let parsed = Selector::parse(selector)
            .map_err(|e| anyhow!("invalid selector {selector}: {e}"))?;
        match document.select(&parsed).next() {
            Some(element) => {
                let text = element.text().collect::<String>().trim().to_string();
                scan.present.push((selector, text));
            }
            None => scan.missing.push(selector),
        }
    }

    Ok(scan)
}

/// Read and scan a page file.
pub fn load_page(path: &Path, table: &BindingTable) -> Result<PageScan> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read page: {}", path.display()))?;
    scan_page(&html, table)
}
