//! 콘텐츠 추출 모듈
//!
//! 지원 형식에서 텍스트를 추출합니다.
//! - 텍스트 / 마크다운: UTF-8로 직접 읽기
//! - PDF: pdf-extract로 페이지별 추출
//!
//! 그 외 형식은 `RagError::UnsupportedFormat`으로 거부됩니다.

pub mod pdf;

use std::fmt;
use std::path::Path;

use crate::error::{RagError, Result};
use crate::knowledge::Metadata;

// ============================================================================
// Document Format
// ============================================================================

/// 지원 문서 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Markdown,
}

impl DocumentFormat {
    /// 확장자로 형식 결정
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "text" => Some(DocumentFormat::PlainText),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            _ => None,
        }
    }

    /// 파일 경로에서 형식 결정
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                RagError::UnsupportedFormat(format!(
                    "{:?} (supported: .pdf, .txt, .md)",
                    path
                ))
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::PlainText => "text",
            DocumentFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Extracted Content
// ============================================================================

/// 추출된 콘텐츠 (PDF는 페이지 단위)
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub format: DocumentFormat,
    pub metadata: ContentMetadata,
}

/// 콘텐츠 메타데이터
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMetadata {
    /// PDF 페이지 번호 (1부터 시작)
    pub page_number: Option<usize>,
    /// 총 페이지 수 (PDF)
    pub total_pages: Option<usize>,
}

impl ContentMetadata {
    /// 청크 메타데이터로 변환
    pub fn to_metadata(&self, format: DocumentFormat) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("format".to_string(), format.as_str().into());
        if let Some(page) = self.page_number {
            metadata.insert("page".to_string(), page.into());
        }
        if let Some(total) = self.total_pages {
            metadata.insert("total_pages".to_string(), total.into());
        }
        metadata
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// 파일에서 콘텐츠 추출
///
/// 형식은 확장자로 결정합니다.
pub async fn extract(path: &Path) -> Result<Vec<ExtractedContent>> {
    let format = DocumentFormat::from_path(path)?;

    match format {
        DocumentFormat::PlainText | DocumentFormat::Markdown => extract_text(path, format).await,
        DocumentFormat::Pdf => extract_pdf(path).await,
    }
}

/// 텍스트 파일에서 추출
///
/// 읽을 수 없거나 UTF-8이 아닌 파일은 `UnsupportedFormat`입니다.
async fn extract_text(path: &Path, format: DocumentFormat) -> Result<Vec<ExtractedContent>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        RagError::UnsupportedFormat(format!("Failed to read text file {:?}: {}", path, e))
    })?;

    Ok(vec![ExtractedContent {
        text,
        format,
        metadata: ContentMetadata::default(),
    }])
}

/// PDF 파일에서 추출
async fn extract_pdf(path: &Path) -> Result<Vec<ExtractedContent>> {
    // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
    let owned = path.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&owned))
        .await
        .map_err(|e| RagError::InvalidInput(format!("PDF extraction task failed: {}", e)))??;

    let total_pages = pages.len();

    Ok(pages
        .into_iter()
        .map(|(page_num, text)| ExtractedContent {
            text,
            format: DocumentFormat::Pdf,
            metadata: ContentMetadata {
                page_number: Some(page_num),
                total_pages: Some(total_pages),
            },
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("txt"), Some(DocumentFormat::PlainText));
        assert_eq!(DocumentFormat::from_extension("md"), Some(DocumentFormat::Markdown));
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }

    #[test]
    fn test_unsupported_path() {
        assert!(matches!(
            DocumentFormat::from_path(Path::new("deck.pptx")),
            Err(RagError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            DocumentFormat::from_path(Path::new("README")),
            Err(RagError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_metadata_conversion() {
        let meta = ContentMetadata {
            page_number: Some(2),
            total_pages: Some(5),
        };
        let map = meta.to_metadata(DocumentFormat::Pdf);
        assert_eq!(map["page"], serde_json::json!(2));
        assert_eq!(map["total_pages"], serde_json::json!(5));
        assert_eq!(map["format"], serde_json::json!("pdf"));

        let plain = ContentMetadata::default().to_metadata(DocumentFormat::Markdown);
        assert_eq!(plain.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_markdown_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("faq.md");
        std::fs::write(&path, "# FAQ\n\nLock-up is 12 months.").unwrap();

        let contents = extract(&path).await.unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].format, DocumentFormat::Markdown);
        assert!(contents[0].text.contains("Lock-up is 12 months."));
        assert!(contents[0].metadata.page_number.is_none());
    }

    #[tokio::test]
    async fn test_extract_rejects_non_utf8_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("faq.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        assert!(matches!(
            extract(&path).await,
            Err(RagError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_rejects_unreadable_files() {
        let dir = TempDir::new().unwrap();

        // 존재하지 않는 파일
        let missing = dir.path().join("missing.md");
        assert!(matches!(
            extract(&missing).await,
            Err(RagError::UnsupportedFormat(_))
        ));

        // 디렉토리는 파일로 읽을 수 없음
        let folder = dir.path().join("notes.txt");
        std::fs::create_dir(&folder).unwrap();
        assert!(matches!(
            extract(&folder).await,
            Err(RagError::UnsupportedFormat(_))
        ));

        let missing_pdf = dir.path().join("deck.pdf");
        assert!(matches!(
            extract(&missing_pdf).await,
            Err(RagError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_rejects_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.xlsx");
        std::fs::write(&path, b"binary").unwrap();

        assert!(matches!(
            extract(&path).await,
            Err(RagError::UnsupportedFormat(_))
        ));
    }
}
