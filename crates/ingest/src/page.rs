use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::generate_doc_id;

/// A single page of extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 0-based position in the document
    pub index: usize,
    pub text: String,
}

/// Page window requested by the caller: 0-based, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub from: usize,
    pub to: usize,
}

impl PageRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Clamp to a document with `total` pages. An inverted window collapses
    /// to an empty range starting at `from`.
    pub fn clamp(&self, total: usize) -> Range<usize> {
        let to = self.to.min(total);
        let from = self.from.min(to);
        from..to
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self { from: 0, to: 5 }
    }
}

/// Pages picked out of a document, with their text already joined
#[derive(Debug, Clone, Serialize)]
pub struct PageSelection {
    pub range: (usize, usize),
    pub pages: usize,
    pub text: String,
}

impl PageSelection {
    pub fn is_empty(&self) -> bool {
        self.pages == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub source: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(source: String, page_texts: Vec<String>) -> Self {
        let doc_id = generate_doc_id(&source);
        let pages = page_texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page { index, text })
            .collect();

        Self {
            doc_id,
            source,
            pages,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Join the text of the pages inside `range`, one newline between pages
    pub fn select(&self, range: PageRange) -> PageSelection {
        let window = range.clamp(self.pages.len());
        let text = self.pages[window.clone()]
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        PageSelection {
            range: (window.start, window.end),
            pages: window.len(),
            text,
        }
    }

    /// Like [`Document::select`], but an empty window is an error
    pub fn select_non_empty(&self, range: PageRange) -> Result<PageSelection> {
        let selection = self.select(range);
        if selection.is_empty() {
            anyhow::bail!(
                "Page range {}..{} selects no pages (document has {})",
                range.from,
                range.to,
                self.pages.len()
            );
        }
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: &[&str]) -> Document {
        Document::new(
            "test.txt".to_string(),
            pages.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_clamp_to_document_length() {
        assert_eq!(PageRange::new(0, 5).clamp(3), 0..3);
        assert_eq!(PageRange::new(1, 2).clamp(3), 1..2);
        assert_eq!(PageRange::new(4, 9).clamp(3), 3..3);
        assert_eq!(PageRange::new(2, 1).clamp(3), 1..1);
    }

    #[test]
    fn test_select_joins_pages_with_newline() {
        let d = doc(&["one", "two", "three"]);
        let selection = d.select(PageRange::new(1, 10));

        assert_eq!(selection.range, (1, 3));
        assert_eq!(selection.pages, 2);
        assert_eq!(selection.text, "two\nthree");
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        let d = doc(&["one"]);
        assert!(d.select(PageRange::new(3, 5)).is_empty());
        assert!(d.select_non_empty(PageRange::new(3, 5)).is_err());
        assert!(d.select_non_empty(PageRange::new(0, 1)).is_ok());
    }

    #[test]
    fn test_doc_id_is_stable() {
        assert_eq!(doc(&["a"]).doc_id, doc(&["b"]).doc_id);
        assert_eq!(doc(&["a"]).doc_id.len(), 32);
    }
}
