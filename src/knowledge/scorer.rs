//! Relevance Scorer - 임베딩 벡터 간 정규화 유사도
//!
//! 코사인 유사도를 [-1, 1]에서 [0, 1]로 변환합니다: `(cos + 1) / 2`.
//! 임베딩 모델이 단위 벡터를 보장하지 않으므로 크기에 무관한 코사인을 사용합니다.

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다.
/// 길이가 다르거나 비어 있거나 노름이 0인 벡터는 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    // f64로 누적 (고차원에서 오차 감소)
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// 관련도 점수 (0.0 ~ 1.0)
///
/// 어느 한쪽이라도 0 벡터면 정확히 0.0입니다 (0.5가 아님).
pub fn relevance_score(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || is_zero(a) || is_zero(b) {
        return 0.0;
    }

    let score = (cosine_similarity(a, b) + 1.0) / 2.0;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

// ============================================================================
// Tests
// ============================================================================
