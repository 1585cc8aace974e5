//! 설정 모듈 - 환경변수 기반 설정 로드
//!
//! `.env` 파일이 있으면 먼저 읽고, 이후 환경변수에서 값을 가져옵니다.
//! 저장 위치 기본값: <로컬 데이터 디렉토리>/.investor-qa/ (Linux: ~/.local/share/.investor-qa/)

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{RagError, Result};
use crate::knowledge::{ChunkConfig, RetrievalConfig};

/// Groq 기본 모델
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// 해시 임베딩 기본 차원 (로컬 모델과 동일)
pub const DEFAULT_HASH_DIMENSION: usize = 384;

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로
///
/// `dirs::data_local_dir()` 아래 `.investor-qa/`이며, 없으면 홈 디렉토리 아래를 씁니다.
/// (Linux: ~/.local/share/.investor-qa/, macOS: ~/Library/Application Support/.investor-qa/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".investor-qa")
}

// ============================================================================
// Types
// ============================================================================

/// 임베딩 백엔드 선택
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// 로컬 ONNX 모델 (all-MiniLM-L6-v2)
    Local,
    /// Gemini 임베딩 API
    Gemini,
    /// 해시 임베딩 (의미 정보 없음, 명시적으로 선택할 때만)
    Hash,
}

impl FromStr for EmbeddingBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "fastembed" => Ok(Self::Local),
            "gemini" => Ok(Self::Gemini),
            "hash" => Ok(Self::Hash),
            other => Err(RagError::InvalidConfig(format!(
                "Unknown embedding provider: {} (expected local, gemini or hash)",
                other
            ))),
        }
    }
}

/// 전체 설정
#[derive(Debug, Clone)]
pub struct Settings {
    /// 데이터 디렉토리 (SQLite DB 위치)
    pub data_dir: PathBuf,
    /// Groq API 키 (없으면 답변 생성이 항상 실패 → 고정 안내 문구)
    pub groq_api_key: Option<String>,
    /// Groq 모델 이름
    pub groq_model: String,
    /// 임베딩 백엔드
    pub embedding_backend: EmbeddingBackend,
    /// 임베딩 차원 (배포 기간 동안 고정)
    pub embedding_dimension: usize,
    /// 청킹 설정
    pub chunk: ChunkConfig,
    /// 검색 설정
    pub retrieval: RetrievalConfig,
}

impl Settings {
    /// 환경변수에서 설정 로드 (`.env` 포함)
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to read .env file: {}", e),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 로드
    ///
    /// 빈 문자열은 설정되지 않은 것으로 취급합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get("INVESTOR_QA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(get_data_dir);

        let has_gemini_key = get("GEMINI_API_KEY").is_some() || get("GOOGLE_AI_API_KEY").is_some();

        let embedding_backend = match get("EMBEDDING_PROVIDER") {
            Some(v) => v.parse()?,
            None if has_gemini_key => EmbeddingBackend::Gemini,
            None => EmbeddingBackend::Local,
        };

        let default_dimension = match embedding_backend {
            EmbeddingBackend::Local => crate::embedding::LOCAL_DIMENSION,
            EmbeddingBackend::Gemini => crate::embedding::DEFAULT_DIMENSION,
            EmbeddingBackend::Hash => DEFAULT_HASH_DIMENSION,
        };

        let defaults_chunk = ChunkConfig::default();
        let defaults_retrieval = RetrievalConfig::default();

        let settings = Self {
            data_dir,
            groq_api_key: get("GROQ_API_KEY"),
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            embedding_backend,
            embedding_dimension: parse_or(&get, "EMBEDDING_DIMENSION", default_dimension)?,
            chunk: ChunkConfig {
                max_characters: parse_or(&get, "CHUNK_SIZE", defaults_chunk.max_characters)?,
                overlap_characters: parse_or(
                    &get,
                    "CHUNK_OVERLAP",
                    defaults_chunk.overlap_characters,
                )?,
            },
            retrieval: RetrievalConfig {
                top_k: parse_or(&get, "RETRIEVAL_TOP_K", defaults_retrieval.top_k)?,
                min_score: parse_or(&get, "RETRIEVAL_MIN_SCORE", defaults_retrieval.min_score)?,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimension == 0 {
            return Err(RagError::InvalidConfig(
                "EMBEDDING_DIMENSION must be greater than 0".to_string(),
            ));
        }
        self.chunk.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    /// SQLite DB 파일 경로
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("investor-qa.db")
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 값이 있으면 파싱, 없으면 기본값
fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RagError::InvalidConfig(format!("{}={}: {}", key, raw, e))),
        None => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_keys() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.embedding_backend, EmbeddingBackend::Local);
        assert_eq!(settings.embedding_dimension, 384);
        assert_eq!(settings.groq_model, DEFAULT_GROQ_MODEL);
        assert!(settings.groq_api_key.is_none());
        assert_eq!(settings.chunk.max_characters, 1000);
        assert_eq!(settings.chunk.overlap_characters, 200);
        assert_eq!(settings.retrieval.top_k, 5);
        assert!((settings.retrieval.min_score - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_gemini_key_selects_gemini_backend() {
        let settings = settings_from(&[("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(settings.embedding_backend, EmbeddingBackend::Gemini);
        assert_eq!(settings.embedding_dimension, 768);
    }

    #[test]
    fn test_explicit_provider_and_overrides() {
        let settings = settings_from(&[
            ("GEMINI_API_KEY", "k"),
            ("EMBEDDING_PROVIDER", "hash"),
            ("EMBEDDING_DIMENSION", "64"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("RETRIEVAL_TOP_K", "3"),
            ("INVESTOR_QA_DATA_DIR", "/tmp/qa"),
        ])
        .unwrap();
        assert_eq!(settings.embedding_backend, EmbeddingBackend::Hash);
        assert_eq!(settings.embedding_dimension, 64);
        assert_eq!(settings.chunk.max_characters, 500);
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.db_path(), PathBuf::from("/tmp/qa/investor-qa.db"));
    }

    #[test]
    fn test_provider_names() {
        assert_eq!("local".parse::<EmbeddingBackend>().unwrap(), EmbeddingBackend::Local);
        assert_eq!("FastEmbed".parse::<EmbeddingBackend>().unwrap(), EmbeddingBackend::Local);
        assert_eq!(" hash ".parse::<EmbeddingBackend>().unwrap(), EmbeddingBackend::Hash);

        let settings = settings_from(&[("EMBEDDING_PROVIDER", "hash")]).unwrap();
        assert_eq!(settings.embedding_dimension, DEFAULT_HASH_DIMENSION);
    }

    #[test]
    fn test_data_dir_location() {
        let dir = get_data_dir();
        assert!(dir.ends_with(".investor-qa"));
        if let Some(base) = dirs::data_local_dir() {
            assert_eq!(dir, base.join(".investor-qa"));
        }

        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.db_path(), dir.join("investor-qa.db"));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let settings = settings_from(&[("GROQ_API_KEY", "  "), ("GROQ_MODEL", "")]).unwrap();
        assert!(settings.groq_api_key.is_none());
        assert_eq!(settings.groq_model, DEFAULT_GROQ_MODEL);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            settings_from(&[("CHUNK_SIZE", "abc")]),
            Err(RagError::InvalidConfig(_))
        ));
        assert!(matches!(
            settings_from(&[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")]),
            Err(RagError::InvalidConfig(_))
        ));
        assert!(matches!(
            settings_from(&[("EMBEDDING_PROVIDER", "openai")]),
            Err(RagError::InvalidConfig(_))
        ));
        assert!(matches!(
            settings_from(&[("RETRIEVAL_MIN_SCORE", "1.5")]),
            Err(RagError::InvalidConfig(_))
        ));
    }
}
