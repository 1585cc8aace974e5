//! Confidence Policy - 신뢰도와 에스컬레이션 결정
//!
//! 기본 정책은 두 값만 사용합니다.
//! - 검색된 청크가 있으면 0.85
//! - 없으면 0.3
//! - 신뢰도 0.7 미만이면 사람 검토로 에스컬레이션
//!
//! 실제 청크 점수는 사용하지 않습니다. 하위 소비자가 상수에 의존할 수 있어
//! 기본 구현은 이 값을 그대로 유지합니다.

use serde::Serialize;

use super::retriever::RetrievalResult;

/// 검색 결과가 있을 때의 신뢰도
pub const CONFIDENCE_WITH_CONTEXT: f32 = 0.85;

/// 검색 결과가 없을 때의 신뢰도
pub const CONFIDENCE_WITHOUT_CONTEXT: f32 = 0.3;

/// 이 값 미만이면 에스컬레이션
pub const ESCALATION_THRESHOLD: f32 = 0.7;

/// 신뢰도 결정
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceDecision {
    /// 신뢰도 (0.0 ~ 1.0)
    pub score: f32,
    /// 사람 검토 필요 여부
    pub requires_escalation: bool,
}

/// 신뢰도 정책 트레이트
///
/// 검색 결과만으로 결정적으로 계산되어야 합니다.
pub trait ConfidencePolicy: Send + Sync {
    fn decide(&self, retrieval: &RetrievalResult) -> ConfidenceDecision;

    fn name(&self) -> &'static str;
}

/// 고정 상수 2단계 정책 (기본값)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedConfidencePolicy;

impl ConfidencePolicy for FixedConfidencePolicy {
    fn decide(&self, retrieval: &RetrievalResult) -> ConfidenceDecision {
        decide(retrieval)
    }

    fn name(&self) -> &'static str {
        "fixed-two-level"
    }
}

/// 기본 정책으로 결정
pub fn decide(retrieval: &RetrievalResult) -> ConfidenceDecision {
    let score = if retrieval.ranked_chunks.is_empty() {
        CONFIDENCE_WITHOUT_CONTEXT
    } else {
        CONFIDENCE_WITH_CONTEXT
    };

    ConfidenceDecision {
        score,
        requires_escalation: score < ESCALATION_THRESHOLD,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::corpus::{Chunk, DocType, Metadata};
    use crate::knowledge::retriever::ScoredChunk;
    use chrono::Utc;

    fn scored(score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: 1,
                content: "Lock-up period is 12 months.".to_string(),
                embedding: vec![1.0],
                source: "faq.md".to_string(),
                doc_type: DocType::Faq,
                metadata: Metadata::new(),
                created_at: Utc::now(),
            },
            score,
        }
    }

    #[test]
    fn test_empty_result_escalates() {
        let decision = decide(&RetrievalResult::default());
        assert_eq!(decision.score, 0.3);
        assert!(decision.requires_escalation);
    }

    #[test]
    fn test_non_empty_result_is_confident() {
        // 청크 점수와 무관하게 0.85
        for s in [0.61, 0.75, 1.0] {
            let result = RetrievalResult::from_ranked(vec![scored(s)]);
            let decision = decide(&result);
            assert_eq!(decision.score, 0.85);
            assert!(!decision.requires_escalation);
        }
    }

    #[test]
    fn test_policy_trait_matches_default() {
        let policy = FixedConfidencePolicy;
        let empty = RetrievalResult::default();
        let full = RetrievalResult::from_ranked(vec![scored(0.9), scored(0.8)]);
        assert_eq!(policy.decide(&empty), decide(&empty));
        assert_eq!(policy.decide(&full), decide(&full));
        assert_eq!(policy.name(), "fixed-two-level");
    }
}
