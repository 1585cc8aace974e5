//! investor-qa - 투자자 Q&A 어시스턴트
//!
//! 문서 코퍼스를 임베딩 검색하여 LLM으로 답변하고,
//! 근거가 부족한 질문은 사람 검토 큐로 에스컬레이션합니다.

pub mod assistant;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod knowledge;
pub mod llm;

// Re-exports
pub use assistant::{Assistant, ChatAnswer, IngestReport};
pub use config::{get_data_dir, EmbeddingBackend, Settings};
pub use embedding::{
    create_embedder, get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding, HashEmbedding,
    LOCAL_DIMENSION,
};
#[cfg(feature = "local-embeddings")]
pub use embedding::FastEmbedding;
pub use error::{RagError, Result};
pub use extractor::DocumentFormat;
pub use knowledge::{
    cosine_similarity, decide, default_chunker, relevance_score, retrieve, Chunk, ChunkConfig,
    Chunker, ConfidenceDecision, ConfidencePolicy, Conversation, ConversationLog, CorpusStore,
    DocType, DocumentSummary, EscalationQueue, EscalationTicket, FixedConfidencePolicy,
    KnowledgeStore, MemoryCorpus, Metadata, NewChunk, RecursiveChunker, RetrievalConfig,
    RetrievalResult, Retriever, ScoredChunk, StoreStats, TicketStatus,
};
pub use llm::{create_language_model, AnswerComposer, GroqChat, LanguageModel};
