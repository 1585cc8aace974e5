//! 에러 타입 - 검색/답변 코어의 실패 분류
//!
//! 코어 연산은 `RagError`를 반환하고, CLI 등 외곽 계층은 `anyhow`로 감쌉니다.

use thiserror::Error;

/// 코어 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 지원하지 않는 문서 형식 (해당 문서만 건너뜀)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 임베딩 모델 호출 실패 (현재 요청만 실패)
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// 언어 모델 호출 실패 (고정 안내 문구로 대체됨)
    #[error("Language model unavailable: {0}")]
    LanguageModelUnavailable(String),

    /// 저장소 접근 실패
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// 임베딩 차원 불일치
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 잘못된 설정값
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 잘못된 입력 (빈 질문, 알 수 없는 문서 타입 등)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for RagError {
    fn from(e: rusqlite::Error) -> Self {
        RagError::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = RagError::DimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 3"
        );
    }

    #[test]
    fn test_sqlite_error_maps_to_store_unavailable() {
        let err: RagError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, RagError::StoreUnavailable(_)));
    }
}
