use scraper::{ElementRef, Html};
use tracing::instrument;

use super::Normalizer;
use crate::consts::{CELL_SELECTOR, LINK_SELECTOR, ROW_SELECTOR};
use crate::error::Result;

/// One row of the security releases index table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRow {
    /// Text of the first cell, whitespace collapsed.
    pub name: String,
    /// Advisory link in the first cell, as written in the page.
    pub link: Option<String>,
    /// Text of the last cell.
    pub date: String,
}

/// Reads the rows of the security releases index, newest first as published.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityIndexNormalizer;

impl Normalizer for SecurityIndexNormalizer {
    type Output = Vec<IndexRow>;

    fn format(&self) -> &'static str {
        "security-index"
    }

    #[instrument(skip_all, fields(bytes = raw.len()))]
    fn normalize(&self, raw: &str) -> Result<Vec<IndexRow>> {
        let document = Html::parse_document(raw);
        let rows: Vec<IndexRow> = document
            .select(&ROW_SELECTOR)
            .filter_map(|row| {
                let cells: Vec<ElementRef<'_>> = row.select(&CELL_SELECTOR).collect();
                let (first, last) = (cells.first()?, cells.last()?);
                Some(IndexRow {
                    name: collapsed_text(first),
                    link: first
                        .select(&LINK_SELECTOR)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(|href| href.trim().to_string()),
                    date: collapsed_text(last),
                })
            })
            .collect();
        tracing::debug!(rows = rows.len(), "Read security index");
        Ok(rows)
    }
}

fn collapsed_text(element: &ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<html><body><table>
        <tr><th>Name and information link</th><th>Available for</th><th>Release date</th></tr>
        <tr>
            <td><a href="https://support.apple.com/en-us/120895">macOS Sonoma 14.4</a></td>
            <td>macOS Sonoma</td>
            <td>07 Mar 2024</td>
        </tr>
        <tr>
            <td>Rapid Security Response iOS 16.5.1 (c)<br>
                <span>This update has no published CVE entries.</span></td>
            <td>iPhone 8 and later</td>
            <td>12 Jul 2023</td>
        </tr>
    </table></body></html>"#;

    #[test]
    fn reads_rows_with_data_cells() {
        let rows = SecurityIndexNormalizer.normalize(INDEX).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "macOS Sonoma 14.4");
        assert_eq!(rows[0].link.as_deref(), Some("https://support.apple.com/en-us/120895"));
        assert_eq!(rows[0].date, "07 Mar 2024");
        assert_eq!(
            rows[1].name,
            "Rapid Security Response iOS 16.5.1 (c) This update has no published CVE entries."
        );
        assert_eq!(rows[1].link, None);
    }

    #[test]
    fn pages_without_tables_give_no_rows() {
        assert!(SecurityIndexNormalizer.normalize("<p>maintenance</p>").unwrap().is_empty());
    }
}
