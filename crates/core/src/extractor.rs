use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load(path).map_err(parse_error)?;

        let pages = document
            .get_pages()
            .into_keys()
            .map(|number| {
                document
                    .extract_text(&[number])
                    .map(|text| PageText { number, text })
                    .map_err(|error| {
                        IngestError::PdfParse(format!("page {number}: {error}"))
                    })
            })
            .filter(|page| !matches!(page, Ok(page) if page.text.trim().is_empty()))
            .collect::<Result<Vec<_>, _>>()?;

        if pages.is_empty() {
            return Err(IngestError::PdfParse(
                "document has no extractable text".to_string(),
            ));
        }

        Ok(pages)
    }
}

fn parse_error(error: lopdf::Error) -> IngestError {
    IngestError::PdfParse(error.to_string())
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

#[cfg(test)]
mod tests {
    use super::{extract_page_texts, LopdfExtractor, PdfExtractor};
    use crate::error::IngestError;
    use crate::testing::write_pdf;
    use tempfile::tempdir;

    #[test]
    fn extracts_text_per_page_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("policy.pdf");
        write_pdf(
            &path,
            &["Section 1 Hospital cover", "Section 2 Dental cover"],
        )?;

        let pages = LopdfExtractor.extract_pages(&path)?;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert!(pages[0].text.contains("Hospital cover"));
        assert_eq!(pages[1].number, 2);
        assert!(pages[1].text.contains("Dental cover"));
        Ok(())
    }

    #[test]
    fn corrupt_pdf_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = extract_page_texts(&path);

        assert!(matches!(result, Err(IngestError::PdfParse(_))));
        Ok(())
    }
}
