//! Text Chunking Module
//!
//! 문서를 독립적으로 검색 가능한 겹치는 텍스트 윈도우로 나눕니다.
//! 분할 위치는 문단 → 줄 → 문장 → 공백 순으로 선호하며,
//! 윈도우 안에 구분자가 없을 때만 글자 단위로 자릅니다.
//!
//! 길이와 오버랩은 모두 문자(char) 단위입니다.

use crate::error::{RagError, Result};

/// 분할 구분자 (우선순위 순)
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// 최대 청크 크기 (문자 수)
    pub max_characters: usize,
    /// 연속 청크 간 오버랩 (문자 수)
    pub overlap_characters: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_characters: 1000,
            overlap_characters: 200,
        }
    }
}

impl ChunkConfig {
    /// 검증된 설정 생성
    pub fn new(max_characters: usize, overlap_characters: usize) -> Result<Self> {
        let config = Self {
            max_characters,
            overlap_characters,
        };
        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    ///
    /// 오버랩이 최대 크기 이상이면 분할이 진행되지 않으므로 거부합니다.
    pub fn validate(&self) -> Result<()> {
        if self.max_characters == 0 {
            return Err(RagError::InvalidConfig(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        if self.overlap_characters >= self.max_characters {
            return Err(RagError::InvalidConfig(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap_characters, self.max_characters
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// RecursiveChunker
// ============================================================================

/// 재귀 구분자 청커
///
/// - 최대 크기 이하의 문서는 문서 전체가 하나의 청크
/// - 빈 문서(공백만 포함)는 청크 없음
/// - 연속 청크는 정확히 `overlap_characters`만큼 겹침
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkConfig,
}

impl RecursiveChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 기본 설정으로 생성 (1000자 / 200자 오버랩)
    pub fn with_defaults() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 지연 청크 시퀀스
    ///
    /// 반환된 이터레이터는 `Clone`이며, 같은 텍스트로 다시 호출하면
    /// 처음부터 같은 시퀀스를 다시 얻습니다.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            max: self.config.max_characters,
            overlap: self.config.overlap_characters,
            start: 0,
            finished: text.trim().is_empty(),
        }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        self.chunks(text).map(str::to_string).collect()
    }

    fn name(&self) -> &'static str {
        "RecursiveChunker"
    }
}

// ============================================================================
// Chunks Iterator
// ============================================================================

/// `RecursiveChunker::chunks`가 반환하는 지연 이터레이터
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    max: usize,
    overlap: usize,
    /// 현재 윈도우 시작 (바이트 오프셋)
    start: usize,
    finished: bool,
}

impl<'a> Chunks<'a> {
    /// `[start, end)` 윈도우에서 분할 위치(바이트) 찾기
    ///
    /// 분할 위치는 구분자 바로 뒤이며, 다음 윈도우가 앞으로 나아가도록
    /// 시작점에서 오버랩보다 많은 문자만큼 떨어져 있어야 합니다.
    fn find_split(&self, start: usize, end: usize) -> usize {
        let window = &self.text[start..end];

        for sep in SEPARATORS {
            // 가장 오른쪽 구분자만 확인하면 충분 (왼쪽은 더 짧음)
            if let Some((i, _)) = window.rmatch_indices(sep).next() {
                let split = start + i + sep.len();
                if self.text[start..split].chars().count() > self.overlap {
                    return split;
                }
            }
        }

        // 구분자 없음 - 글자 단위 절단
        end
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if self.finished {
                return None;
            }

            let start = self.start;
            let end = advance_chars(self.text, start, self.max);

            // 남은 텍스트가 한 윈도우에 들어감 - 마지막 청크
            if end >= self.text.len() {
                self.finished = true;
                let piece = &self.text[start..];
                if piece.trim().is_empty() {
                    return None;
                }
                return Some(piece);
            }

            let split = self.find_split(start, end);
            let piece = &self.text[start..split];
            self.start = retreat_chars(self.text, split, self.overlap);

            if piece.trim().is_empty() {
                continue;
            }
            return Some(piece);
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `start`에서 `n`문자 뒤의 바이트 오프셋 (끝을 넘으면 텍스트 길이)
#[inline]
fn advance_chars(text: &str, start: usize, n: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len())
}

/// `pos`에서 `n`문자 앞의 바이트 오프셋
#[inline]
fn retreat_chars(text: &str, pos: usize, n: usize) -> usize {
    if n == 0 {
        return pos;
    }
    text[..pos]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(RecursiveChunker::with_defaults())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max: usize, overlap: usize) -> RecursiveChunker {
        RecursiveChunker::new(ChunkConfig::new(max, overlap).unwrap()).unwrap()
    }

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    fn assert_overlaps(chunks: &[&str], overlap: usize) {
        for pair in chunks.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].chars().collect();
                chars[chars.len() - overlap..].iter().collect()
            };
            let head: String = pair[1].chars().take(overlap).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = RecursiveChunker::with_defaults();
        assert_eq!(chunker.chunks("").count(), 0);
        assert_eq!(chunker.chunks("   \n\n\t ").count(), 0);
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_short_document_is_single_chunk() {
        let chunker = RecursiveChunker::with_defaults();
        let text = "Q: What is the minimum commitment?\nA: USD 250,000.";
        let chunks: Vec<&str> = chunker.chunks(text).collect();
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_document_at_exact_limit_is_single_chunk() {
        let chunker = chunker(100, 20);
        let text = "x".repeat(100);
        let chunks: Vec<&str> = chunker.chunks(&text).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_hard_cut_without_separators() {
        let chunker = RecursiveChunker::with_defaults();
        let text = "a".repeat(2500);
        let chunks: Vec<&str> = chunker.chunks(&text).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(chunks[0]), 1000);
        assert_eq!(char_len(chunks[1]), 1000);
        assert_eq!(char_len(chunks[2]), 900);
        assert_overlaps(&chunks, 200);
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let chunker = chunker(1000, 100);
        let text = format!("{}\n\n{}", "A".repeat(600), "B".repeat(600));
        let chunks: Vec<&str> = chunker.chunks(&text).collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n\n", "A".repeat(600)));
        assert!(chunks[1].ends_with(&"B".repeat(600)));
        assert_overlaps(&chunks, 100);
    }

    #[test]
    fn test_prefers_line_over_sentence() {
        let chunker = chunker(50, 5);
        let text = format!("{}. {}\n{}", "a".repeat(10), "b".repeat(20), "c".repeat(40));
        let first = chunker.chunks(&text).next().unwrap();
        assert!(first.ends_with('\n'));
    }

    #[test]
    fn test_falls_back_to_sentence_then_space() {
        let chunker = chunker(40, 5);

        let sentences = "The fund closed in May. Capital calls follow quarterly schedules.";
        let first = chunker.chunks(sentences).next().unwrap();
        assert_eq!(first, "The fund closed in May. ");

        let words = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let first = chunker.chunks(words).next().unwrap();
        assert!(first.ends_with(' '));
        assert!(char_len(first) <= 40);
    }

    #[test]
    fn test_long_document_respects_limits_and_overlap() {
        let chunker = RecursiveChunker::with_defaults();
        let paragraph = "Our fund invests in growth-stage companies across Asia. \
                         Management fees are charged annually on committed capital. \
                         Distributions are made after each realization event.";
        let text = vec![paragraph; 40].join("\n\n");

        let chunks: Vec<&str> = chunker.chunks(&text).collect();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 1000);
        }
        assert_overlaps(&chunks, 200);

        // 마지막 청크는 문서의 끝을 포함
        assert!(text.ends_with(chunks[chunks.len() - 1]));
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = chunker(30, 5);
        let text = "투자 설명서는 분기마다 갱신됩니다 ".repeat(10);
        let chunks: Vec<&str> = chunker.chunks(&text).collect();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 30);
        }
        assert_overlaps(&chunks, 5);
    }

    #[test]
    fn test_chunks_are_restartable() {
        let chunker = chunker(50, 10);
        let text = "word ".repeat(60);

        let iter = chunker.chunks(&text);
        let first: Vec<&str> = iter.clone().collect();
        let second: Vec<&str> = iter.collect();
        let third: Vec<&str> = chunker.chunks(&text).collect();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_zero_overlap() {
        let chunker = chunker(10, 0);
        let text = "a".repeat(25);
        let chunks: Vec<&str> = chunker.chunks(&text).collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(100, 100).is_err());
        assert!(ChunkConfig::new(100, 150).is_err());
        assert!(ChunkConfig::new(100, 99).is_ok());

        let default = ChunkConfig::default();
        assert_eq!(default.max_characters, 1000);
        assert_eq!(default.overlap_characters, 200);
    }

    #[test]
    fn test_trait_object() {
        let chunker = default_chunker();
        assert_eq!(chunker.name(), "RecursiveChunker");
        assert_eq!(chunker.chunk("short"), vec!["short".to_string()]);
    }

    #[test]
    fn test_char_helpers() {
        let s = "ab세계cd";
        assert_eq!(advance_chars(s, 0, 3), 5);
        assert_eq!(advance_chars(s, 0, 100), s.len());
        assert_eq!(retreat_chars(s, s.len(), 2), 8);
        assert_eq!(retreat_chars(s, 5, 0), 5);
        assert_eq!(retreat_chars(s, 2, 10), 0);
    }
}
