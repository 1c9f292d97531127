//! PDF text extraction, one entry per non-empty page.

use std::path::Path;

use thiserror::Error;

use super::{clean_text, PageText};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF file not found: '{0}'")]
    FileNotFound(String),

    #[error("PDF '{0}' is password-protected")]
    PasswordProtected(String),

    #[error("PDF '{0}' appears to be corrupted")]
    Corrupted(String),

    #[error("Failed to extract text from '{path}': {message}")]
    Extraction { path: String, message: String },
}

/// Reads a PDF and returns cleaned page texts with their 1-based page numbers.
///
/// Pages that are empty after cleaning are dropped; numbering still follows
/// the physical page order.
pub fn read_pdf_pages(path: &Path) -> Result<Vec<PageText>, PdfError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(PdfError::FileNotFound(display));
    }

    // pdf-extract panics on some malformed documents.
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| PdfError::Corrupted(display.clone()))?;

    let pages = extracted.map_err(|e| {
        let message = e.to_string();
        let lower = message.to_lowercase();
        if lower.contains("password") || lower.contains("encrypt") {
            PdfError::PasswordProtected(display.clone())
        } else if lower.contains("invalid") || lower.contains("malformed") || lower.contains("corrupt")
        {
            PdfError::Corrupted(display.clone())
        } else {
            PdfError::Extraction {
                path: display.clone(),
                message,
            }
        }
    })?;

    Ok(number_pages(pages))
}

/// Numbers extracted page texts from 1 and drops pages that clean to nothing.
pub fn number_pages<I, S>(pages: I) -> Vec<PageText>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .enumerate()
        .filter_map(|(index, page_text)| {
            let text = clean_text(page_text.as_ref());
            if text.is_empty() {
                return None;
            }
            Some(PageText {
                page: index as u32 + 1,
                text,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let result = read_pdf_pages(Path::new("/nonexistent/path/to/file.pdf"));
        assert!(matches!(result, Err(PdfError::FileNotFound(_))));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(b"This is not a valid PDF").unwrap();
        temp_file.flush().unwrap();

        assert!(read_pdf_pages(temp_file.path()).is_err());
    }

    #[test]
    fn blank_pages_keep_physical_numbering() {
        let pages = number_pages(["Intro  text\n", " \n\t", "Battery:\n CR2032", ""]);

        assert_eq!(
            pages,
            vec![
                PageText { page: 1, text: "Intro text".to_string() },
                PageText { page: 3, text: "Battery: CR2032".to_string() },
            ]
        );
    }

    fn write_pdf(path: &Path, page_texts: &[&str]) {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
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
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn each_pdf_page_keeps_its_own_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manual.pdf");
        write_pdf(&path, &["Alpha battery page one", "Beta tire page two"]);

        let pages = read_pdf_pages(&path).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page, 1);
        assert!(pages[0].text.contains("Alpha battery"));
        assert!(!pages[0].text.contains("Beta"));
        assert_eq!(pages[1].page, 2);
        assert!(pages[1].text.contains("Beta tire"));
        assert!(!pages[1].text.contains("Alpha"));
    }
}
