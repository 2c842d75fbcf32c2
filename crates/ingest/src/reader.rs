use anyhow::{Context, Result};
use lopdf::Document as PdfDocument;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::page::Document;

/// Page separator emitted by most text exporters
const FORM_FEED: char = '\x0C';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Detect the format from a file name or path
    pub fn from_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" | "md" => Ok(Self::PlainText),
            _ => anyhow::bail!("Unsupported file format: {:?}", extension),
        }
    }
}

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<Document> {
        let source = path.to_string_lossy().to_string();
        let format = DocumentFormat::from_name(&source)?;

        let bytes = fs::read(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        Self::read_bytes(source, format, bytes).await
    }

    /// Parse an in-memory document (an upload, for instance)
    pub async fn read_bytes(
        source: String,
        format: DocumentFormat,
        bytes: Vec<u8>,
    ) -> Result<Document> {
        let pages = match format {
            DocumentFormat::Pdf => tokio::task::spawn_blocking(move || pdf_pages(&bytes))
                .await
                .context("PDF extraction task panicked")??,
            DocumentFormat::PlainText => {
                let text = String::from_utf8(bytes)
                    .context(format!("{} is not valid UTF-8", source))?;
                text_pages(&text)
            }
        };

        debug!(source = %source, pages = pages.len(), "Document loaded");
        Ok(Document::new(source, pages))
    }
}

/// Extract the text of every page, in page order
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let doc = PdfDocument::load_mem(bytes).context("Failed to parse PDF")?;

    let mut pages = Vec::new();
    for (page_num, _page_id) in doc.get_pages() {
        let text = doc
            .extract_text(&[page_num])
            .with_context(|| format!("Failed to extract text from page {}", page_num))?;
        pages.push(text);
    }

    Ok(pages)
}

/// Split plain text into pages on form feeds; no form feed means one page
pub fn text_pages(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split(FORM_FEED).map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let resources_id = doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            });
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_name("hamlet.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_name("notes.md").unwrap(), DocumentFormat::PlainText);
        assert!(DocumentFormat::from_name("image.png").is_err());
        assert!(DocumentFormat::from_name("no_extension").is_err());
    }

    #[test]
    fn test_text_pages_split_on_form_feed() {
        assert_eq!(text_pages("a\x0Cb\x0Cc"), vec!["a", "b", "c"]);
        assert_eq!(text_pages("single page"), vec!["single page"]);
        assert!(text_pages("").is_empty());
    }

    #[test]
    fn test_pdf_pages_in_order() {
        let bytes = sample_pdf(&["Hamlet", "Ophelia"]);
        let pages = pdf_pages(&bytes).unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("Hamlet"));
        assert!(pages[1].contains("Ophelia"));
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        assert!(pdf_pages(b"definitely not a pdf").is_err());
    }

    #[tokio::test]
    async fn test_read_bytes_plain_text() {
        let doc = FileReader::read_bytes(
            "upload.txt".to_string(),
            DocumentFormat::PlainText,
            b"first\x0Csecond".to_vec(),
        )
        .await
        .unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].text, "second");
    }

    #[tokio::test]
    async fn test_read_bytes_rejects_invalid_utf8() {
        let result = FileReader::read_bytes(
            "upload.txt".to_string(),
            DocumentFormat::PlainText,
            vec![0xff, 0xfe, 0x00],
        )
        .await;
        assert!(result.is_err());
    }
}
