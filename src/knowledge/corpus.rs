//! Corpus - 청크 데이터 모델과 저장소 인터페이스
//!
//! 검색 코어는 `CorpusStore`의 전체 스캔(`fetch_all_chunks`)만 사용합니다.
//! 스캔 순서(삽입 순서)는 동점 처리 기준이 됩니다.

use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// 청크 메타데이터 (문자열 → 값)
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Types
// ============================================================================

/// 문서 타입 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Faq,
    Investment,
    Guide,
    News,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Faq => "faq",
            DocType::Investment => "investment",
            DocType::Guide => "guide",
            DocType::News => "news",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "faq" => Ok(DocType::Faq),
            "investment" => Ok(DocType::Investment),
            "guide" => Ok(DocType::Guide),
            "news" => Ok(DocType::News),
            other => Err(RagError::InvalidInput(format!(
                "Unknown document type: {} (expected faq, investment, guide or news)",
                other
            ))),
        }
    }
}

/// 저장된 청크
///
/// 저장 후에는 메타데이터 외에 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub source: String,
    pub doc_type: DocType,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// 새 청크 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    pub embedding: Vec<f32>,
    pub source: String,
    pub doc_type: DocType,
    pub metadata: Metadata,
}

// ============================================================================
// CorpusStore Trait
// ============================================================================

/// 청크 저장소 인터페이스
///
/// 각 청크 행은 원자적으로 읽혀야 합니다 (임베딩이 잘린 채 읽히지 않음).
/// 한 번의 스캔 전체에 대한 일관성은 요구하지 않습니다.
pub trait CorpusStore: Send + Sync {
    /// 저장소의 임베딩 차원 (D)
    fn dimension(&self) -> usize;

    /// 전체 청크 조회 (삽입 순서)
    fn fetch_all_chunks(&self) -> Result<Vec<Chunk>>;

    /// 청크 저장
    ///
    /// 임베딩 길이가 D가 아니면 `DimensionMismatch`로 거부합니다.
    fn insert_chunk(&self, chunk: NewChunk) -> Result<Chunk>;
}

/// 임베딩 차원 검증
pub fn validate_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(RagError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

// ============================================================================
// MemoryCorpus
// ============================================================================

/// 인메모리 청크 저장소 (테스트, 임시 사용)
#[derive(Debug)]
pub struct MemoryCorpus {
    dimension: usize,
    chunks: RwLock<Vec<Chunk>>,
}

impl MemoryCorpus {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            chunks: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CorpusStore for MemoryCorpus {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn fetch_all_chunks(&self) -> Result<Vec<Chunk>> {
        let chunks = self
            .chunks
            .read()
            .map_err(|e| RagError::StoreUnavailable(format!("Lock error: {}", e)))?;
        Ok(chunks.clone())
    }

    fn insert_chunk(&self, chunk: NewChunk) -> Result<Chunk> {
        validate_dimension(self.dimension, &chunk.embedding)?;

        let mut chunks = self
            .chunks
            .write()
            .map_err(|e| RagError::StoreUnavailable(format!("Lock error: {}", e)))?;

        let stored = Chunk {
            id: chunks.len() as i64 + 1,
            content: chunk.content,
            embedding: chunk.embedding,
            source: chunk.source,
            doc_type: chunk.doc_type,
            metadata: chunk.metadata,
            created_at: Utc::now(),
        };
        chunks.push(stored.clone());
        Ok(stored)
    }
}

// ============================================================================
// Tests
// ============================================================================
