//! Escalation & Conversation Log - 사람 검토 큐와 대화 기록 인터페이스
//!
//! 코어는 티켓 생성(`open_ticket`)까지만 담당합니다.
//! 관리자 답변을 코퍼스에 다시 넣는 기능은 없습니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

// ============================================================================
// Escalation Ticket
// ============================================================================

/// 티켓 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(RagError::InvalidInput(format!(
                "Unknown ticket status: {}",
                other
            ))),
        }
    }
}

/// 에스컬레이션 티켓
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationTicket {
    pub id: String,
    pub user_query: String,
    pub confidence_score: f32,
    pub admin_response: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 에스컬레이션 큐 인터페이스
pub trait EscalationQueue: Send + Sync {
    /// 저신뢰 질의로 열린 티켓 생성, 티켓 ID 반환
    fn open_ticket(&self, query_text: &str, confidence_score: f32) -> Result<String>;
}

// ============================================================================
// Conversation Log
// ============================================================================

/// 대화 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub source_documents: Vec<String>,
    pub confidence_score: f32,
    pub created_at: DateTime<Utc>,
}

/// 새 대화 기록 입력용 구조체
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub source_documents: Vec<String>,
    pub confidence_score: f32,
}

/// 대화 기록 인터페이스
pub trait ConversationLog: Send + Sync {
    /// 대화 저장, 대화 ID 반환
    fn log_conversation(&self, conversation: NewConversation) -> Result<String>;
}
