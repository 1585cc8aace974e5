//! Retriever - 임계값 → 정렬 → 절단
//!
//! 코퍼스 전체를 선형 스캔하며 질의 벡터와의 관련도를 계산합니다.
//! 1. `min_score` 이하인 청크 제외
//! 2. 점수 내림차순 안정 정렬 (동점이면 스캔 순서 유지)
//! 3. 상위 `top_k`개만 유지

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{RagError, Result};

use super::corpus::Chunk;
use super::scorer::relevance_score;

/// 컨텍스트 구분자
const CONTEXT_SEPARATOR: &str = "\n\n";

// ============================================================================
// Types
// ============================================================================

/// 검색 설정
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// 최대 결과 수
    pub top_k: usize,
    /// 최소 점수 (이 값 초과만 통과)
    pub min_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: 0.6,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::InvalidConfig(
                "top_k must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(RagError::InvalidConfig(format!(
                "min_score must be within [0, 1], got {}",
                self.min_score
            )));
        }
        Ok(())
    }
}

/// 점수가 매겨진 청크
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// 관련도 (0.0 ~ 1.0)
    pub score: f32,
}

/// 검색 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    /// 점수 내림차순, 길이 ≤ top_k
    pub ranked_chunks: Vec<ScoredChunk>,
    /// 청크 내용 연결 (빈 줄 구분)
    pub context: String,
    /// 청크별 출처 (ranked_chunks와 같은 순서)
    pub sources: Vec<String>,
}

impl RetrievalResult {
    /// 순위가 매겨진 청크로 결과 구성
    pub fn from_ranked(ranked_chunks: Vec<ScoredChunk>) -> Self {
        let context = ranked_chunks
            .iter()
            .map(|s| s.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        let sources = ranked_chunks
            .iter()
            .map(|s| s.chunk.source.clone())
            .collect();

        Self {
            ranked_chunks,
            context,
            sources,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranked_chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranked_chunks.len()
    }
}

// ============================================================================
// Retriever
// ============================================================================

/// 선형 스캔 검색기
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// 설정된 top_k / min_score로 검색
    pub fn search<I>(&self, query_vector: &[f32], corpus: I) -> RetrievalResult
    where
        I: IntoIterator<Item = Chunk>,
    {
        retrieve(query_vector, corpus, self.config.top_k, self.config.min_score)
    }
}

/// 질의 벡터로 상위 청크 검색
///
/// 빈 코퍼스이거나 임계값을 넘는 청크가 없으면 빈 결과를 반환합니다.
///
/// # Arguments
/// * `query_vector` - 질의 임베딩
/// * `corpus` - 스캔 순서대로의 청크
/// * `top_k` - 최대 결과 수
/// * `min_score` - 이 값을 초과해야 통과
pub fn retrieve<I>(query_vector: &[f32], corpus: I, top_k: usize, min_score: f32) -> RetrievalResult
where
    I: IntoIterator<Item = Chunk>,
{
    let mut scored: Vec<ScoredChunk> = corpus
        .into_iter()
        .filter_map(|chunk| {
            let score = relevance_score(query_vector, &chunk.embedding);
            (score > min_score).then_some(ScoredChunk { chunk, score })
        })
        .collect();

    // sort_by는 안정 정렬 - 동점은 스캔 순서 유지
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    tracing::debug!("Retrieved {} chunks (top_k={}, min_score={})", scored.len(), top_k, min_score);

    RetrievalResult::from_ranked(scored)
}

// ============================================================================
// Tests
// ============================================================================
