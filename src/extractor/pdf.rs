//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 텍스트를 추출합니다.

use std::path::Path;

use regex::Regex;

use crate::error::{RagError, Result};

/// PDF에서 텍스트 추출
///
/// 페이지별로 텍스트를 추출하여 (페이지 번호, 텍스트) 튜플 벡터로 반환합니다.
/// 페이지 번호는 1부터 시작합니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<Vec<(usize, String)>> {
    let bytes = std::fs::read(path).map_err(|e| {
        RagError::UnsupportedFormat(format!("Failed to read PDF {:?}: {}", path, e))
    })?;

    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        RagError::UnsupportedFormat(format!("Failed to extract text from PDF {:?}: {}", path, e))
    })?;

    // 스캔 문서 등 텍스트 레이어 없음
    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![(1, String::new())]);
    }

    Ok(split_pdf_pages(&text)
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .collect())
}

/// PDF 텍스트를 페이지별로 분리
///
/// 폼피드(\x0c) → "--- Page N ---" 구분선 순으로 시도하고,
/// 둘 다 실패하면 전체를 한 페이지로 봅니다.
fn split_pdf_pages(text: &str) -> Vec<String> {
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.len() > 1 {
        return pages;
    }

    if let Ok(page_pattern) =
        Regex::new(r"(?m)^[\s]*[-=]+[\s]*(?:Page[\s]*)?(\d+)[\s]*[-=]+[\s]*$")
    {
        let pages: Vec<String> = page_pattern
            .split(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if pages.len() > 1 {
            return pages;
        }
    }

    vec![text.to_string()]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pdf_pages_with_formfeed() {
        let text = "Fund overview\x0cFee structure\x0cRedemption terms";
        let pages = split_pdf_pages(text);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], "Fund overview");
        assert_eq!(pages[1], "Fee structure");
    }

    #[test]
    fn test_split_pdf_pages_with_page_markers() {
        let text = "Intro text\n--- Page 2 ---\nSecond page text";
        let pages = split_pdf_pages(text);
        assert_eq!(pages, vec!["Intro text", "Second page text"]);
    }

    #[test]
    fn test_split_pdf_pages_no_separator() {
        let text = "Just some text without page breaks";
        let pages = split_pdf_pages(text);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_unreadable_pdf_is_unsupported() {
        assert!(matches!(
            extract_text_from_pdf(Path::new("/nonexistent/deck.pdf")),
            Err(RagError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_corrupt_pdf_is_unsupported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("deck.pdf");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        assert!(matches!(
            extract_text_from_pdf(&path),
            Err(RagError::UnsupportedFormat(_))
        ));
    }
}
