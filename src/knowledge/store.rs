//! Knowledge Store - rusqlite 기반 동기 저장소
//!
//! 청크(임베딩 포함), 대화 기록, 에스컬레이션 티켓을 저장합니다.
//! 저장 위치: `Settings::db_path()` (기본값 `get_data_dir()/investor-qa.db`)
//!
//! 스키마는 `PRAGMA user_version`으로 추적하는 버전별 마이그레이션으로 관리합니다.
//! 실행 중에 컬럼을 비교해 고치는 방식은 사용하지 않습니다.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{RagError, Result};

use super::corpus::{validate_dimension, Chunk, CorpusStore, DocType, Metadata, NewChunk};
use super::escalation::{
    Conversation, ConversationLog, EscalationQueue, EscalationTicket, NewConversation,
    TicketStatus,
};

// ============================================================================
// Migrations
// ============================================================================

/// 버전별 마이그레이션 (인덱스 + 1 = user_version)
const MIGRATIONS: &[&str] = &[
    // v1: 기본 테이블
    r#"
    CREATE TABLE store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        source TEXT NOT NULL,
        doc_type TEXT NOT NULL CHECK (doc_type IN ('faq', 'investment', 'guide', 'news')),
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    );

    CREATE TABLE conversations (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        message TEXT NOT NULL,
        response TEXT NOT NULL,
        source_documents TEXT NOT NULL DEFAULT '[]',
        confidence_score REAL NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE escalation_tickets (
        id TEXT PRIMARY KEY,
        user_query TEXT NOT NULL,
        confidence_score REAL NOT NULL,
        admin_response TEXT,
        status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'closed')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    // v2: 조회 인덱스
    r#"
    CREATE INDEX idx_chunks_source ON chunks(source, doc_type);
    CREATE INDEX idx_tickets_status ON escalation_tickets(status, created_at);
    CREATE INDEX idx_conversations_created ON conversations(created_at);
    "#,
];

/// 현재 스키마 버전
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

const DIMENSION_KEY: &str = "embedding_dimension";

// ============================================================================
// Types
// ============================================================================

/// 출처별 문서 요약
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub source: String,
    pub doc_type: DocType,
    pub chunk_count: usize,
    /// 가장 최근 청크 생성 시각
    pub created_at: DateTime<Utc>,
}

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_queries: usize,
    /// 열린 티켓 수
    pub unanswered_count: usize,
    /// 평균 신뢰도 (기록 없으면 0.0)
    pub avg_confidence: f64,
    pub total_chunks: usize,
    pub db_path: PathBuf,
}

// ============================================================================
// KnowledgeStore
// ============================================================================

/// Knowledge Store - 동기 SQLite 저장소
///
/// 연결은 Mutex로 직렬화되므로 한 청크 행은 항상 온전하게 읽힙니다.
pub struct KnowledgeStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
    dimension: usize,
}

impl KnowledgeStore {
    /// 저장소 열기 (없으면 생성)
    ///
    /// # Arguments
    /// * `path` - DB 파일 경로
    /// * `dimension` - 임베딩 차원 (기존 DB와 다르면 에러)
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RagError::StoreUnavailable(format!(
                        "Failed to create database directory {:?}: {}",
                        parent, e
                    ))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
            dimension,
        };

        store.migrate()?;
        store.check_dimension()?;
        Ok(store)
    }

    /// DB 경로 반환
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RagError::StoreUnavailable(format!("Lock error: {}", e)))
    }

    /// 미적용 마이그레이션 실행
    fn migrate(&self) -> Result<()> {
        let mut conn = self.lock()?;

        let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current > SCHEMA_VERSION {
            return Err(RagError::StoreUnavailable(format!(
                "Database schema version {} is newer than supported version {}",
                current, SCHEMA_VERSION
            )));
        }

        for (i, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
            let version = i as i64 + 1;
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::info!("Applied schema migration v{}", version);
        }

        tracing::debug!("Knowledge store ready at {:?}", self.db_path);
        Ok(())
    }

    /// 저장된 임베딩 차원 확인 (최초 실행 시 기록)
    fn check_dimension(&self) -> Result<()> {
        let conn = self.lock()?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM store_meta WHERE key = ?1",
                params![DIMENSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => {
                conn.execute(
                    "INSERT INTO store_meta (key, value) VALUES (?1, ?2)",
                    params![DIMENSION_KEY, self.dimension.to_string()],
                )?;
            }
            Some(value) if value == self.dimension.to_string() => {}
            Some(value) => {
                return Err(RagError::InvalidConfig(format!(
                    "Store at {:?} was created with embedding dimension {}, configured {}",
                    self.db_path, value, self.dimension
                )));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Chunks
    // ------------------------------------------------------------------------

    /// 청크 메타데이터 수정 (청크에서 허용되는 유일한 변경)
    pub fn update_metadata(&self, id: i64, metadata: &Metadata) -> Result<bool> {
        let conn = self.lock()?;
        let json = serde_json::Value::Object(metadata.clone()).to_string();
        let rows = conn.execute(
            "UPDATE chunks SET metadata = ?1 WHERE id = ?2",
            params![json, id],
        )?;
        Ok(rows > 0)
    }

    /// 청크 수
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// 출처별 문서 목록 (최근 순)
    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT source, doc_type, COUNT(*) AS chunk_count, MAX(created_at) AS latest
             FROM chunks
             GROUP BY source, doc_type
             ORDER BY latest DESC, source ASC",
        )?;

        let docs = stmt
            .query_map([], |row| {
                Ok(DocumentSummary {
                    source: row.get(0)?,
                    doc_type: parse_doc_type(row, 1)?,
                    chunk_count: row.get::<_, i64>(2)? as usize,
                    created_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(docs)
    }

    /// 전체 청크 삭제 (명시적 일괄 삭제)
    pub fn delete_all_chunks(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count = conn.execute("DELETE FROM chunks", [])?;
        tracing::info!("Deleted {} chunks", count);
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Tickets
    // ------------------------------------------------------------------------

    /// 열린 티켓 목록 (최근 순)
    pub fn list_open_tickets(&self) -> Result<Vec<EscalationTicket>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_query, confidence_score, admin_response, status, created_at, updated_at
             FROM escalation_tickets
             WHERE status = 'open'
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let tickets = stmt
            .query_map([], row_to_ticket)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tickets)
    }

    /// ID로 티켓 조회
    pub fn get_ticket(&self, id: &str) -> Result<Option<EscalationTicket>> {
        let conn = self.lock()?;

        let ticket = conn
            .query_row(
                "SELECT id, user_query, confidence_score, admin_response, status, created_at, updated_at
                 FROM escalation_tickets WHERE id = ?1",
                params![id],
                row_to_ticket,
            )
            .optional()?;

        Ok(ticket)
    }

    /// 관리자 답변 등록 후 티켓 종료
    pub fn respond_ticket(&self, id: &str, response: &str) -> Result<EscalationTicket> {
        if response.trim().is_empty() {
            return Err(RagError::InvalidInput("Response must not be empty".to_string()));
        }

        {
            let conn = self.lock()?;
            let rows = conn.execute(
                "UPDATE escalation_tickets
                 SET admin_response = ?1, status = 'closed', updated_at = ?2
                 WHERE id = ?3",
                params![response, now_timestamp(), id],
            )?;

            if rows == 0 {
                return Err(RagError::NotFound(format!("Ticket {}", id)));
            }
        }

        tracing::info!("Closed ticket {}", id);
        self.get_ticket(id)?
            .ok_or_else(|| RagError::NotFound(format!("Ticket {}", id)))
    }

    // ------------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------------

    /// 최근 대화 기록
    pub fn recent_conversations(&self, limit: usize) -> Result<Vec<Conversation>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, message, response, source_documents, confidence_score, created_at
             FROM conversations
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let conversations = stmt
            .query_map(params![limit as i64], |row| {
                let sources_json: String = row.get(4)?;
                let source_documents: Vec<String> = serde_json::from_str(&sources_json)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                    })?;

                Ok(Conversation {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    message: row.get(2)?,
                    response: row.get(3)?,
                    source_documents,
                    confidence_score: row.get::<_, f64>(5)? as f32,
                    created_at: parse_datetime(row.get::<_, String>(6)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conversations)
    }

    /// 저장소 통계
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let total_queries: i64 =
            conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
        let unanswered: i64 = conn.query_row(
            "SELECT COUNT(*) FROM escalation_tickets WHERE status = 'open'",
            [],
            |row| row.get(0),
        )?;
        let avg_confidence: Option<f64> = conn.query_row(
            "SELECT AVG(confidence_score) FROM conversations",
            [],
            |row| row.get(0),
        )?;
        let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;

        Ok(StoreStats {
            total_queries: total_queries as usize,
            unanswered_count: unanswered as usize,
            avg_confidence: avg_confidence.unwrap_or(0.0),
            total_chunks: total_chunks as usize,
            db_path: self.db_path.clone(),
        })
    }
}

impl CorpusStore for KnowledgeStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn fetch_all_chunks(&self) -> Result<Vec<Chunk>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, content, embedding, source, doc_type, metadata, created_at
             FROM chunks
             ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], row_to_chunk)?;

        let mut chunks = Vec::new();
        for row in rows {
            match row {
                Ok(chunk) if chunk.embedding.len() == self.dimension => chunks.push(chunk),
                Ok(chunk) => tracing::warn!(
                    "Skipping chunk {} with dimension {} (expected {})",
                    chunk.id,
                    chunk.embedding.len(),
                    self.dimension
                ),
                Err(e) => tracing::warn!("Skipping unreadable chunk row: {}", e),
            }
        }

        Ok(chunks)
    }

    fn insert_chunk(&self, chunk: NewChunk) -> Result<Chunk> {
        validate_dimension(self.dimension, &chunk.embedding)?;

        let conn = self.lock()?;
        let created_at = Utc::now();
        let metadata_json = serde_json::Value::Object(chunk.metadata.clone()).to_string();

        conn.execute(
            "INSERT INTO chunks (content, embedding, source, doc_type, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.content,
                encode_embedding(&chunk.embedding),
                chunk.source,
                chunk.doc_type.as_str(),
                metadata_json,
                format_timestamp(&created_at),
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Inserted chunk {} from {}", id, chunk.source);

        Ok(Chunk {
            id,
            content: chunk.content,
            embedding: chunk.embedding,
            source: chunk.source,
            doc_type: chunk.doc_type,
            metadata: chunk.metadata,
            created_at,
        })
    }
}

impl EscalationQueue for KnowledgeStore {
    fn open_ticket(&self, query_text: &str, confidence_score: f32) -> Result<String> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO escalation_tickets
                (id, user_query, confidence_score, admin_response, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?5)",
            params![
                id,
                query_text,
                confidence_score as f64,
                TicketStatus::Open.as_str(),
                now
            ],
        )?;

        tracing::info!("Opened escalation ticket {} (confidence={:.2})", id, confidence_score);
        Ok(id)
    }
}

impl ConversationLog for KnowledgeStore {
    fn log_conversation(&self, conversation: NewConversation) -> Result<String> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();
        let sources = serde_json::to_string(&conversation.source_documents)
            .map_err(|e| RagError::StoreUnavailable(e.to_string()))?;

        conn.execute(
            "INSERT INTO conversations
                (id, user_id, message, response, source_documents, confidence_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                conversation.user_id,
                conversation.message,
                conversation.response,
                sources,
                conversation.confidence_score as f64,
                now_timestamp()
            ],
        )?;

        Ok(id)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 임베딩을 little-endian f32 BLOB으로 인코딩
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// little-endian f32 BLOB 디코딩
fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let blob: Vec<u8> = row.get(2)?;
    let embedding = decode_embedding(&blob).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Blob,
            Box::new(RagError::StoreUnavailable(format!(
                "embedding blob of {} bytes is not a f32 array",
                blob.len()
            ))),
        )
    })?;

    let metadata_json: String = row.get(5)?;
    let metadata = match serde_json::from_str::<serde_json::Value>(&metadata_json) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => Metadata::new(),
        Err(e) => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Text,
                Box::new(e),
            ))
        }
    };

    Ok(Chunk {
        id: row.get(0)?,
        content: row.get(1)?,
        embedding,
        source: row.get(3)?,
        doc_type: parse_doc_type(row, 4)?,
        metadata,
        created_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn row_to_ticket(row: &Row<'_>) -> rusqlite::Result<EscalationTicket> {
    let status: String = row.get(4)?;
    let status = status
        .parse::<TicketStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(EscalationTicket {
        id: row.get(0)?,
        user_query: row.get(1)?,
        confidence_score: row.get::<_, f64>(2)? as f32,
        admin_response: row.get(3)?,
        status,
        created_at: parse_datetime(row.get::<_, String>(5)?),
        updated_at: parse_datetime(row.get::<_, String>(6)?),
    })
}

fn parse_doc_type(row: &Row<'_>, idx: usize) -> rusqlite::Result<DocType> {
    let raw: String = row.get(idx)?;
    raw.parse::<DocType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 고정 폭 RFC3339 (문자열 정렬 = 시간 정렬)
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 3;

    fn create_test_store() -> (TempDir, KnowledgeStore) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let store = KnowledgeStore::open(&db_path, DIM).unwrap();
        (dir, store)
    }

    fn new_chunk(content: &str, source: &str, doc_type: DocType) -> NewChunk {
        NewChunk {
            content: content.to_string(),
            embedding: vec![0.1, -0.2, 0.3],
            source: source.to_string(),
            doc_type,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_insert_and_fetch_chunks() {
        let (_dir, store) = create_test_store();

        let mut metadata = Metadata::new();
        metadata.insert("page".to_string(), serde_json::json!(2));

        let inserted = store
            .insert_chunk(NewChunk {
                metadata,
                ..new_chunk("Minimum ticket is USD 250k.", "faq.pdf", DocType::Faq)
            })
            .unwrap();
        assert!(inserted.id > 0);
        store
            .insert_chunk(new_chunk("Fund II closed.", "news.md", DocType::News))
            .unwrap();

        let chunks = store.fetch_all_chunks().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "Minimum ticket is USD 250k.");
        assert_eq!(chunks[0].embedding, vec![0.1, -0.2, 0.3]);
        assert_eq!(chunks[0].doc_type, DocType::Faq);
        assert_eq!(chunks[0].metadata["page"], serde_json::json!(2));
        assert_eq!(chunks[1].source, "news.md");
    }

    #[test]
    fn test_insert_rejects_dimension_mismatch() {
        let (_dir, store) = create_test_store();

        let err = store
            .insert_chunk(NewChunk {
                embedding: vec![1.0, 2.0],
                ..new_chunk("bad", "faq.pdf", DocType::Faq)
            })
            .unwrap_err();

        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
        assert_eq!(store.chunk_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_with_other_dimension_fails() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("dim.db");

        KnowledgeStore::open(&db_path, 3).unwrap();
        assert!(KnowledgeStore::open(&db_path, 3).is_ok());
        assert!(matches!(
            KnowledgeStore::open(&db_path, 384),
            Err(RagError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_migrations_set_user_version() {
        let (_dir, store) = create_test_store();
        let conn = store.lock().unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_update_metadata() {
        let (_dir, store) = create_test_store();
        let chunk = store
            .insert_chunk(new_chunk("text", "guide.md", DocType::Guide))
            .unwrap();

        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), serde_json::json!("Onboarding"));
        assert!(store.update_metadata(chunk.id, &metadata).unwrap());
        assert!(!store.update_metadata(9999, &metadata).unwrap());

        let chunks = store.fetch_all_chunks().unwrap();
        assert_eq!(chunks[0].metadata["title"], serde_json::json!("Onboarding"));
        assert_eq!(chunks[0].content, "text");
    }

    #[test]
    fn test_list_and_delete_documents() {
        let (_dir, store) = create_test_store();

        for i in 0..3 {
            store
                .insert_chunk(new_chunk(&format!("faq {}", i), "faq.pdf", DocType::Faq))
                .unwrap();
        }
        store
            .insert_chunk(new_chunk("strategy", "strategy.md", DocType::Investment))
            .unwrap();

        let docs = store.list_documents().unwrap();
        assert_eq!(docs.len(), 2);
        let faq = docs.iter().find(|d| d.source == "faq.pdf").unwrap();
        assert_eq!(faq.chunk_count, 3);
        assert_eq!(faq.doc_type, DocType::Faq);

        assert_eq!(store.delete_all_chunks().unwrap(), 4);
        assert!(store.fetch_all_chunks().unwrap().is_empty());
        assert!(store.list_documents().unwrap().is_empty());
    }

    #[test]
    fn test_ticket_lifecycle() {
        let (_dir, store) = create_test_store();

        let id = store.open_ticket("Can I exit early?", 0.3).unwrap();
        let other = store.open_ticket("What is the hurdle rate?", 0.3).unwrap();

        let open = store.list_open_tickets().unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].id, other);
        assert_eq!(open[1].status, TicketStatus::Open);
        assert!(open[1].admin_response.is_none());

        let closed = store
            .respond_ticket(&id, "Early exit is possible after year 3.")
            .unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert_eq!(
            closed.admin_response.as_deref(),
            Some("Early exit is possible after year 3.")
        );
        assert!(closed.updated_at >= closed.created_at);

        let open = store.list_open_tickets().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, other);
    }

    #[test]
    fn test_respond_unknown_ticket() {
        let (_dir, store) = create_test_store();
        assert!(matches!(
            store.respond_ticket("missing", "answer"),
            Err(RagError::NotFound(_))
        ));
        assert!(matches!(
            store.respond_ticket("missing", "  "),
            Err(RagError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_conversations_and_stats() {
        let (_dir, store) = create_test_store();

        let empty = store.stats().unwrap();
        assert_eq!(empty.total_queries, 0);
        assert_eq!(empty.avg_confidence, 0.0);

        store
            .log_conversation(NewConversation {
                user_id: "lp-1".to_string(),
                message: "fees?".to_string(),
                response: "2 and 20.".to_string(),
                source_documents: vec!["faq.pdf".to_string()],
                confidence_score: 0.85,
            })
            .unwrap();
        store
            .log_conversation(NewConversation {
                user_id: "lp-2".to_string(),
                message: "weather?".to_string(),
                response: "I don't have information about that.".to_string(),
                source_documents: vec![],
                confidence_score: 0.3,
            })
            .unwrap();
        store.open_ticket("weather?", 0.3).unwrap();
        store
            .insert_chunk(new_chunk("fees", "faq.pdf", DocType::Faq))
            .unwrap();

        let recent = store.recent_conversations(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].source_documents, vec!["faq.pdf".to_string()]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_queries, 2);
        assert_eq!(stats.unanswered_count, 1);
        assert_eq!(stats.total_chunks, 1);
        assert!((stats.avg_confidence - 0.575).abs() < 1e-6);
    }

    #[test]
    fn test_decode_embedding_rejects_partial_floats() {
        assert!(decode_embedding(&[0, 0, 0]).is_none());
        assert_eq!(
            decode_embedding(&encode_embedding(&[1.5, -2.0])).unwrap(),
            vec![1.5, -2.0]
        );
    }
}
