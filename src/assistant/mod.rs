//! Assistant - 질의응답 오케스트레이터
//!
//! 하나의 질문은 다음 순서로 처리됩니다.
//! 1. 질문 임베딩
//! 2. 코퍼스 전체 스캔 + 검색
//! 3. 신뢰도 결정 (답변 생성과 독립)
//! 4. 답변 생성 (실패 시 고정 안내 문구)
//! 5. 대화 기록, 필요 시 에스컬레이션 티켓 생성
//!
//! 협력 객체는 모두 생성 시 명시적으로 주입합니다. 전역 상태는 없습니다.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extractor;
use crate::knowledge::{
    ChunkConfig, ConfidencePolicy, ConversationLog, CorpusStore, DocType, EscalationQueue,
    FixedConfidencePolicy, KnowledgeStore, Metadata, NewChunk, NewConversation,
    RecursiveChunker, RetrievalConfig, Retriever,
};
use crate::llm::{AnswerComposer, LanguageModel};

// ============================================================================
// Types
// ============================================================================

/// 질문에 대한 응답
#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub response: String,
    pub confidence_score: f32,
    /// 검색된 청크별 출처 (순위 순, 중복 가능)
    pub sources: Vec<String>,
    /// 사람 검토 필요 여부
    pub requires_attention: bool,
    /// 대화 기록 ID (기록 실패 시 None)
    pub conversation_id: Option<String>,
    /// 생성된 에스컬레이션 티켓 ID
    pub ticket_id: Option<String>,
}

/// 수집 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub doc_type: Option<DocType>,
    /// 저장된 청크 수
    pub chunks_created: usize,
    /// 임베딩 실패 등으로 건너뛴 청크 수
    pub chunks_rejected: usize,
}

impl IngestReport {
    fn new(source: &str, doc_type: DocType) -> Self {
        Self {
            source: source.to_string(),
            doc_type: Some(doc_type),
            ..Default::default()
        }
    }

    fn merge(&mut self, other: IngestReport) {
        self.chunks_created += other.chunks_created;
        self.chunks_rejected += other.chunks_rejected;
    }
}

// ============================================================================
// Assistant
// ============================================================================

/// 투자자 Q&A 어시스턴트
pub struct Assistant {
    embedder: Arc<dyn EmbeddingProvider>,
    composer: AnswerComposer,
    corpus: Arc<dyn CorpusStore>,
    conversations: Arc<dyn ConversationLog>,
    escalations: Arc<dyn EscalationQueue>,
    policy: Arc<dyn ConfidencePolicy>,
    retriever: Retriever,
    chunker: RecursiveChunker,
}

impl Assistant {
    /// 협력 객체로 생성
    ///
    /// 임베딩 차원과 코퍼스 차원이 다르면 `DimensionMismatch`를 반환합니다.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
        corpus: Arc<dyn CorpusStore>,
        conversations: Arc<dyn ConversationLog>,
        escalations: Arc<dyn EscalationQueue>,
    ) -> Result<Self> {
        if embedder.dimension() != corpus.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: corpus.dimension(),
                actual: embedder.dimension(),
            });
        }

        Ok(Self {
            embedder,
            composer: AnswerComposer::new(model),
            corpus,
            conversations,
            escalations,
            policy: Arc::new(FixedConfidencePolicy),
            retriever: Retriever::default(),
            chunker: RecursiveChunker::with_defaults(),
        })
    }

    /// 하나의 SQLite 저장소로 코퍼스/대화/티켓을 모두 처리
    pub fn with_store(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn LanguageModel>,
        store: Arc<KnowledgeStore>,
    ) -> Result<Self> {
        Self::new(embedder, model, store.clone(), store.clone(), store)
    }

    pub fn with_retrieval(mut self, config: RetrievalConfig) -> Result<Self> {
        self.retriever = Retriever::new(config)?;
        Ok(self)
    }

    pub fn with_chunking(mut self, config: ChunkConfig) -> Result<Self> {
        self.chunker = RecursiveChunker::new(config)?;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: Arc<dyn ConfidencePolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ------------------------------------------------------------------------
    // Ask
    // ------------------------------------------------------------------------

    /// 질문에 답변
    ///
    /// 빈 질문과 임베딩 실패만 에러로 반환합니다.
    /// 언어 모델/저장소 실패는 경고 후 계속 진행합니다.
    pub async fn ask(&self, user_id: &str, message: &str) -> Result<ChatAnswer> {
        if message.trim().is_empty() {
            return Err(RagError::InvalidInput("Message must not be empty".to_string()));
        }

        let query_vector = self.embedder.embed(message).await?;

        let corpus = match self.corpus.fetch_all_chunks() {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("Corpus unavailable, answering without context: {}", e);
                Vec::new()
            }
        };

        let retrieval = self.retriever.search(&query_vector, corpus);
        let decision = self.policy.decide(&retrieval);

        tracing::info!(
            "Query from {}: {} chunks retrieved, confidence={:.2}, escalate={}",
            user_id,
            retrieval.len(),
            decision.score,
            decision.requires_escalation
        );

        let response = self.composer.compose(message, &retrieval.context).await;

        let conversation_id = match self.conversations.log_conversation(NewConversation {
            user_id: user_id.to_string(),
            message: message.to_string(),
            response: response.clone(),
            source_documents: retrieval.sources.clone(),
            confidence_score: decision.score,
        }) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to log conversation: {}", e);
                None
            }
        };

        let ticket_id = if decision.requires_escalation {
            match self.escalations.open_ticket(message, decision.score) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Failed to open escalation ticket: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(ChatAnswer {
            response,
            confidence_score: decision.score,
            sources: retrieval.sources,
            requires_attention: decision.requires_escalation,
            conversation_id,
            ticket_id,
        })
    }

    // ------------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------------

    /// 텍스트를 청킹하여 코퍼스에 추가
    ///
    /// 임베딩 실패나 차원 불일치 청크는 건너뛰고 `chunks_rejected`에 집계합니다.
    /// 저장소 접근 실패는 에러로 반환합니다.
    pub async fn ingest_text(
        &self,
        text: &str,
        source: &str,
        doc_type: DocType,
        metadata: &Metadata,
    ) -> Result<IngestReport> {
        if source.trim().is_empty() {
            return Err(RagError::InvalidInput("Source must not be empty".to_string()));
        }

        let mut report = IngestReport::new(source, doc_type);

        for (index, content) in self.chunker.chunks(text).enumerate() {
            let embedding = match self.embedder.embed(content).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    tracing::warn!("Skipping chunk {} of {}: {}", index, source, e);
                    report.chunks_rejected += 1;
                    continue;
                }
            };

            let mut chunk_metadata = metadata.clone();
            chunk_metadata.insert("chunk_index".to_string(), index.into());

            match self.corpus.insert_chunk(NewChunk {
                content: content.to_string(),
                embedding,
                source: source.to_string(),
                doc_type,
                metadata: chunk_metadata,
            }) {
                Ok(_) => report.chunks_created += 1,
                Err(e @ RagError::DimensionMismatch { .. }) => {
                    tracing::warn!("Skipping chunk {} of {}: {}", index, source, e);
                    report.chunks_rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Ingested {}: {} chunks created, {} rejected",
            source,
            report.chunks_created,
            report.chunks_rejected
        );
        Ok(report)
    }

    /// 파일을 추출/청킹하여 코퍼스에 추가
    ///
    /// 출처는 파일 이름입니다. PDF는 페이지 번호가 메타데이터에 들어갑니다.
    pub async fn ingest_file(&self, path: &Path, doc_type: DocType) -> Result<IngestReport> {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| RagError::InvalidInput(format!("Not a file path: {:?}", path)))?;

        let contents = extractor::extract(path).await?;
        let mut report = IngestReport::new(&source, doc_type);

        for content in contents {
            let metadata = content.metadata.to_metadata(content.format);
            let page_report = self
                .ingest_text(&content.text, &source, doc_type, &metadata)
                .await?;
            report.merge(page_report);
        }

        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
