//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환하는 프로바이더입니다.
//! 같은 입력은 항상 같은 벡터를 반환해야 합니다 (재현 가능한 검색).
//!
//! - `FastEmbedding`: 로컬 ONNX 모델 (all-MiniLM-L6-v2, 기본값)
//! - `GeminiEmbedding`: Gemini 임베딩 API
//! - `HashEmbedding`: 해시 임베딩 (의미 정보 없음, 결정적 테스트용)
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = FastEmbedding::new(get_data_dir().join("models"));
//! let embedding = embedder.embed("What is the minimum investment?").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::error::{RagError, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 실패 시 `RagError::EmbeddingUnavailable`을 반환합니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini Embedding
// ============================================================================

/// Gemini 임베딩 API 엔드포인트
/// source: https://ai.google.dev/gemini-api/docs/embeddings
const GEMINI_EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:embedContent";

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 768;

/// Rate Limiter 설정 (Gemini 무료 티어: 60 RPM)
const RATE_LIMIT_RPM: u32 = 60;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
/// 호출 간 최소 딜레이
const MIN_DELAY_MS: u64 = 1000;

/// Google Gemini 임베딩 구현체
///
/// 재시도하지 않습니다. 실패는 즉시 `EmbeddingUnavailable`로 전파됩니다.
#[derive(Debug)]
pub struct GeminiEmbedding {
    api_key: String,
    client: reqwest::Client,
    dimension: usize,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

/// Rate Limiter with minimum delay between requests
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    max_requests: u32,
    window: Duration,
    min_delay: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Vec::new(),
            max_requests,
            window,
            min_delay: Duration::from_millis(MIN_DELAY_MS),
            last_request: None,
        }
    }

    /// 요청 가능 여부 확인 및 대기
    async fn acquire(&mut self) {
        // 1. 최소 딜레이 (버스트 방지)
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                tracing::debug!("Min delay: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        let now = Instant::now();

        // 2. 윈도우 밖의 오래된 요청 제거
        self.requests.retain(|&t| now.duration_since(t) < self.window);

        // 3. Rate limit 초과 시 대기
        if self.requests.len() >= self.max_requests as usize {
            if let Some(&oldest) = self.requests.first() {
                let wait_time = self.window.saturating_sub(now.duration_since(oldest));
                if !wait_time.is_zero() {
                    tracing::debug!("Rate limit reached, waiting {:?}", wait_time);
                    tokio::time::sleep(wait_time).await;
                }
                let now = Instant::now();
                self.requests.retain(|&t| now.duration_since(t) < self.window);
            }
        }

        let now = Instant::now();
        self.requests.push(now);
        self.last_request = Some(now);
    }
}

impl GeminiEmbedding {
    /// 차원을 지정하여 생성
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    /// * `dimension` - 임베딩 차원 (768, 1536, 3072 중 선택)
    pub fn with_dimension(api_key: String, dimension: usize) -> Result<Self> {
        if ![768, 1536, 3072].contains(&dimension) {
            return Err(RagError::InvalidConfig(format!(
                "Invalid dimension: {}. Must be 768, 1536, or 3072",
                dimension
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagError::EmbeddingUnavailable(format!("HTTP client: {}", e)))?;

        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(
            RATE_LIMIT_RPM,
            RATE_LIMIT_WINDOW,
        )));

        Ok(Self {
            api_key,
            client,
            dimension,
            rate_limiter,
        })
    }

    /// 환경변수에서 API 키를 읽어 차원 지정하여 생성
    pub fn from_env_with_dimension(dimension: usize) -> Result<Self> {
        let api_key = get_api_key()?;
        Self::with_dimension(api_key, dimension)
    }
}

/// Gemini API 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
    #[serde(rename = "taskType")]
    task_type: String,
    #[serde(rename = "outputDimensionality", skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

/// Gemini API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let request = EmbedRequest {
            model: "models/gemini-embedding-001".to_string(),
            content: EmbedContent {
                parts: vec![EmbedPart {
                    text: text.to_string(),
                }],
            },
            task_type: "SEMANTIC_SIMILARITY".to_string(),
            output_dimensionality: Some(self.dimension),
        };

        {
            let mut limiter = self.rate_limiter.lock().await;
            limiter.acquire().await;
        }

        // API 키는 URL이 아닌 헤더로 전송
        let response = self
            .client
            .post(GEMINI_EMBED_URL)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::EmbeddingUnavailable(format!("response body: {}", e)))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<GeminiError>(&body) {
                Ok(error) => format!(
                    "Gemini API error ({}): {}",
                    error.error.status, error.error.message
                ),
                Err(_) => format!("Gemini API error ({}): {}", status, body),
            };
            return Err(RagError::EmbeddingUnavailable(message));
        }

        let embed_response: EmbedResponse = serde_json::from_str(&body).map_err(|e| {
            RagError::EmbeddingUnavailable(format!("invalid embedding response: {}", e))
        })?;

        Ok(embed_response.embedding.values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "gemini-embedding-001"
    }
}

// ============================================================================
// Local ONNX Embedding (fastembed)
// ============================================================================

/// all-MiniLM-L6-v2 출력 차원
pub const LOCAL_DIMENSION: usize = 384;

/// fastembed 로컬 임베딩 구현체
///
/// 모델은 첫 호출 시 `cache_dir`로 다운로드되고 이후 재사용됩니다.
#[cfg(feature = "local-embeddings")]
pub struct FastEmbedding {
    cache_dir: std::path::PathBuf,
    model: tokio::sync::OnceCell<Arc<Mutex<fastembed::TextEmbedding>>>,
}

#[cfg(feature = "local-embeddings")]
impl FastEmbedding {
    pub fn new(cache_dir: std::path::PathBuf) -> Self {
        Self {
            cache_dir,
            model: tokio::sync::OnceCell::new(),
        }
    }

    async fn get_model(&self) -> Result<Arc<Mutex<fastembed::TextEmbedding>>> {
        self.model
            .get_or_try_init(|| async {
                let cache_dir = self.cache_dir.clone();
                tokio::task::spawn_blocking(move || {
                    let options =
                        fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                            .with_cache_dir(cache_dir)
                            .with_show_download_progress(true);
                    let model = fastembed::TextEmbedding::try_new(options).map_err(|e| {
                        RagError::EmbeddingUnavailable(format!("Failed to load model: {}", e))
                    })?;
                    Ok(Arc::new(Mutex::new(model)))
                })
                .await
                .map_err(|e| RagError::EmbeddingUnavailable(format!("model load task: {}", e)))?
            })
            .await
            .map(Arc::clone)
    }
}

#[cfg(feature = "local-embeddings")]
impl std::fmt::Debug for FastEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedding")
            .field("cache_dir", &self.cache_dir)
            .field("loaded", &self.model.initialized())
            .finish()
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl EmbeddingProvider for FastEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; LOCAL_DIMENSION]);
        }

        let model = self.get_model().await?;
        let text = text.to_string();
        let mut vectors = tokio::task::spawn_blocking(move || {
            let mut model = model.blocking_lock();
            model.embed(vec![text], None)
        })
        .await
        .map_err(|e| RagError::EmbeddingUnavailable(format!("embedding task: {}", e)))?
        .map_err(|e| RagError::EmbeddingUnavailable(format!("local embedding failed: {}", e)))?;

        let vector = vectors.pop().ok_or_else(|| {
            RagError::EmbeddingUnavailable("model returned no embedding".to_string())
        })?;

        if vector.len() != LOCAL_DIMENSION {
            return Err(RagError::DimensionMismatch {
                expected: LOCAL_DIMENSION,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        LOCAL_DIMENSION
    }

    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }
}

// ============================================================================
// Hash Embedding
// ============================================================================

/// 해시 임베딩
///
/// 토큰(소문자 영숫자 단어)과 인접 토큰 쌍을 SHA-256으로 해싱해
/// 부호 있는 버킷에 누적한 뒤 L2 정규화합니다.
/// 어휘가 겹치는 정도만 반영하고 의미는 반영하지 않습니다.
/// 모델 없이 결과가 완전히 결정적이므로 테스트와 오프라인 점검에만 사용합니다.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidConfig(
                "Hash embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    fn accumulate(&self, vector: &mut [f32], feature: &str) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        for token in &tokens {
            self.accumulate(&mut vector, token);
        }
        for pair in tokens.windows(2) {
            self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "local-hash"
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GEMINI_API_KEY` 환경변수
/// 2. `GOOGLE_AI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String> {
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Ok(key);
            }
        }
    }

    Err(RagError::InvalidConfig(
        "API key not found. Set GEMINI_API_KEY or GOOGLE_AI_API_KEY environment variable."
            .to_string(),
    ))
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
pub fn create_embedder(settings: &crate::config::Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    use crate::config::EmbeddingBackend;

    let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding_backend {
        #[cfg(feature = "local-embeddings")]
        EmbeddingBackend::Local => {
            if settings.embedding_dimension != LOCAL_DIMENSION {
                return Err(RagError::InvalidConfig(format!(
                    "Local embedding dimension is fixed at {} (got {})",
                    LOCAL_DIMENSION, settings.embedding_dimension
                )));
            }
            Arc::new(FastEmbedding::new(settings.data_dir.join("models")))
        }
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingBackend::Local => {
            return Err(RagError::InvalidConfig(
                "Local embeddings require the `local-embeddings` feature. \
                 Set EMBEDDING_PROVIDER=gemini or rebuild with default features."
                    .to_string(),
            ))
        }
        EmbeddingBackend::Gemini => Arc::new(GeminiEmbedding::from_env_with_dimension(
            settings.embedding_dimension,
        )?),
        EmbeddingBackend::Hash => Arc::new(HashEmbedding::new(settings.embedding_dimension)?),
    };

    tracing::info!(
        "Using {} embedding (dimension: {})",
        embedder.name(),
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================
