//! Knowledge 모듈 - 검색 코어와 지식 저장소
//!
//! - Chunker: 재귀 구분자 기반 텍스트 분할 (지연 반복자)
//! - Scorer: 코사인 유사도 → [0, 1] 관련도
//! - Retriever: 임계값 → 정렬 → top-k 절단
//! - Confidence: 2단계 신뢰도와 에스컬레이션 결정
//! - Store: SQLite 청크/대화/티켓 저장소

mod chunker;
mod confidence;
mod corpus;
mod escalation;
mod retriever;
mod scorer;
mod store;

// Re-exports
pub use chunker::{default_chunker, ChunkConfig, Chunker, Chunks, RecursiveChunker};
pub use confidence::{
    decide, ConfidenceDecision, ConfidencePolicy, FixedConfidencePolicy,
    CONFIDENCE_WITHOUT_CONTEXT, CONFIDENCE_WITH_CONTEXT, ESCALATION_THRESHOLD,
};
pub use corpus::{
    validate_dimension, Chunk, CorpusStore, DocType, MemoryCorpus, Metadata, NewChunk,
};
pub use escalation::{
    Conversation, ConversationLog, EscalationQueue, EscalationTicket, NewConversation,
    TicketStatus,
};
pub use retriever::{retrieve, RetrievalConfig, RetrievalResult, Retriever, ScoredChunk};
pub use scorer::{cosine_similarity, relevance_score};
pub use store::{DocumentSummary, KnowledgeStore, StoreStats, SCHEMA_VERSION};
