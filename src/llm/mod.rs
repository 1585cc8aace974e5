//! LLM 모듈 - 답변 생성
//!
//! 검색된 컨텍스트와 질문을 고정 프롬프트로 묶어 언어 모델에 전달합니다.
//! 모델 호출이 실패하면 에러 대신 고정 안내 문구를 답변으로 사용합니다.
//!
//! - `GroqChat`: Groq OpenAI 호환 Chat Completions API
//! - `AnswerComposer`: 프롬프트 구성 + 실패 시 대체 문구

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Groq Chat Completions 엔드포인트
const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// 사실 위주 답변을 위한 낮은 temperature
const GROQ_TEMPERATURE: f32 = 0.1;

/// 언어 모델 호출 실패 시 사용자에게 보여줄 문구
pub const APOLOGY_RESPONSE: &str =
    "I'm having trouble processing your request. Please try again.";

/// 검색 결과가 없을 때 프롬프트에 들어가는 컨텍스트
pub const EMPTY_CONTEXT: &str = "No relevant FAQ documents found.";

// ============================================================================
// LanguageModel Trait
// ============================================================================

/// 언어 모델 트레이트
///
/// 실패 시 `RagError::LanguageModelUnavailable`을 반환합니다.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 프롬프트로 텍스트 생성
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Groq Chat
// ============================================================================

/// Groq Chat Completions 구현체
#[derive(Debug)]
pub struct GroqChat {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GroqChat {
    /// # Arguments
    /// * `api_key` - Groq API 키
    /// * `model` - 모델 이름 (예: llama-3.1-8b-instant)
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(RagError::InvalidConfig(
                "GROQ_API_KEY must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RagError::LanguageModelUnavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for GroqChat {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: GROQ_TEMPERATURE,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(self.api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::LanguageModelUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::LanguageModelUnavailable(format!("response body: {}", e)))?;

        if !status.is_success() {
            return Err(RagError::LanguageModelUnavailable(format!(
                "Groq API error ({}): {}",
                status, body
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            RagError::LanguageModelUnavailable(format!("invalid chat response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| {
                RagError::LanguageModelUnavailable("response has no message content".to_string())
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// 설정되지 않은 언어 모델
///
/// API 키가 없을 때 사용됩니다. 모든 호출이 실패하므로 답변은 항상 고정 안내 문구가 됩니다.
#[derive(Debug, Clone)]
pub struct UnconfiguredModel {
    reason: String,
}

impl UnconfiguredModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for UnconfiguredModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::LanguageModelUnavailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// 설정에 맞는 언어 모델 생성
///
/// `GROQ_API_KEY`가 없으면 경고 후 `UnconfiguredModel`을 반환합니다.
pub fn create_language_model(settings: &crate::config::Settings) -> Result<Arc<dyn LanguageModel>> {
    let Some(api_key) = settings.groq_api_key.clone() else {
        tracing::warn!("GROQ_API_KEY not set. Answers will fall back to the apology message.");
        return Ok(Arc::new(UnconfiguredModel::new("GROQ_API_KEY not set")));
    };

    let model = GroqChat::new(api_key, settings.groq_model.clone())?;
    tracing::info!("Using Groq model: {}", model.name());
    Ok(Arc::new(model))
}

// ============================================================================
// Answer Composer
// ============================================================================

/// 답변 생성기
///
/// 언어 모델 실패는 호출자에게 전파되지 않습니다.
#[derive(Clone)]
pub struct AnswerComposer {
    model: Arc<dyn LanguageModel>,
}

impl AnswerComposer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// 프롬프트 구성
    ///
    /// 컨텍스트가 비어 있으면 `EMPTY_CONTEXT`를 넣습니다.
    pub fn build_prompt(query: &str, context: &str) -> String {
        let context = if context.trim().is_empty() {
            EMPTY_CONTEXT
        } else {
            context
        };

        format!(
            "You are a helpful PE/VC firm assistant. Answer the investor's question based ONLY on the provided context. \n\
             If the context doesn't contain relevant information, say \"I don't have information about that. Please contact our team.\"\n\
             \n\
             Context:\n\
             {context}\n\
             \n\
             Question: {query}\n\
             \n\
             Answer:"
        )
    }

    /// 답변 생성 (실패 시 `APOLOGY_RESPONSE`)
    pub async fn compose(&self, query: &str, context: &str) -> String {
        let prompt = Self::build_prompt(query, context);

        match self.model.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Language model {} failed: {}", self.model.name(), e);
                APOLOGY_RESPONSE.to_string()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
