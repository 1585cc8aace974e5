//! CLI 모듈
//!
//! investor-qa CLI 명령어 정의 및 구현

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::assistant::{Assistant, IngestReport};
use crate::collector::FileCollector;
use crate::config::Settings;
use crate::embedding::create_embedder;
use crate::knowledge::{DocType, KnowledgeStore, Metadata};
use crate::llm::create_language_model;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "investor-qa")]
#[command(version, about = "투자자 Q&A 어시스턴트", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일, 폴더, 또는 텍스트를 코퍼스에 추가
    Ingest {
        /// 직접 입력할 텍스트
        #[arg(short, long)]
        text: Option<String>,

        /// 수집할 파일 경로 (.pdf, .txt, .md)
        #[arg(long)]
        file: Option<PathBuf>,

        /// 수집할 폴더 경로 (재귀)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 텍스트 입력 시 출처 이름
        #[arg(short, long, default_value = "direct-input")]
        source: String,

        /// 문서 타입 (faq, investment, guide, news)
        #[arg(long, default_value = "faq")]
        doc_type: String,
    },

    /// 질문하기
    Ask {
        /// 질문
        question: String,

        /// 사용자 ID
        #[arg(short, long, default_value = "anonymous")]
        user: String,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 출처별 문서 목록
    Documents,

    /// 모든 문서 삭제
    ClearDocuments {
        /// 확인 없이 삭제
        #[arg(long)]
        yes: bool,
    },

    /// 답변 대기 중인 에스컬레이션 티켓 목록
    Tickets,

    /// 티켓에 답변하고 종료
    Respond {
        /// 티켓 ID
        id: String,

        /// 관리자 답변
        response: String,
    },

    /// 최근 대화 기록
    Conversations {
        /// 결과 개수 제한
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 통계
    Stats,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().context("설정 로드 실패")?;

    match cli.command {
        Commands::Ingest {
            text,
            file,
            dir,
            source,
            doc_type,
        } => cmd_ingest(&settings, text, file, dir, &source, &doc_type).await,
        Commands::Ask {
            question,
            user,
            json,
        } => cmd_ask(&settings, &question, &user, json).await,
        Commands::Documents => cmd_documents(&settings),
        Commands::ClearDocuments { yes } => cmd_clear_documents(&settings, yes),
        Commands::Tickets => cmd_tickets(&settings),
        Commands::Respond { id, response } => cmd_respond(&settings, &id, &response),
        Commands::Conversations { limit } => cmd_conversations(&settings, limit),
        Commands::Stats => cmd_stats(&settings),
        Commands::Status => cmd_status(&settings),
    }
}

// ============================================================================
// Setup
// ============================================================================

fn open_store(settings: &Settings) -> Result<Arc<KnowledgeStore>> {
    let store = KnowledgeStore::open(&settings.db_path(), settings.embedding_dimension)
        .context("KnowledgeStore 열기 실패")?;
    Ok(Arc::new(store))
}

fn build_assistant(settings: &Settings) -> Result<(Arc<KnowledgeStore>, Assistant)> {
    let store = open_store(settings)?;
    let embedder = create_embedder(settings).context("임베딩 프로바이더 생성 실패")?;
    let model = create_language_model(settings).context("언어 모델 생성 실패")?;

    let assistant = Assistant::with_store(embedder, model, store.clone())
        .context("어시스턴트 초기화 실패")?
        .with_retrieval(settings.retrieval.clone())?
        .with_chunking(settings.chunk.clone())?;

    Ok((store, assistant))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 문서 수집 명령어 (ingest)
async fn cmd_ingest(
    settings: &Settings,
    text: Option<String>,
    file: Option<PathBuf>,
    dir: Option<PathBuf>,
    source: &str,
    doc_type: &str,
) -> Result<()> {
    let doc_type: DocType = doc_type.parse()?;
    let (_store, assistant) = build_assistant(settings)?;

    if let Some(text) = text {
        println!("[*] 텍스트 임베딩 및 저장 중...");
        let report = assistant
            .ingest_text(&text, source, doc_type, &Metadata::new())
            .await
            .context("텍스트 수집 실패")?;
        print_report(&report);
        return Ok(());
    }

    if let Some(path) = file {
        println!("[*] 파일 수집 중: {}", path.display());
        let report = assistant
            .ingest_file(&path, doc_type)
            .await
            .with_context(|| format!("파일 수집 실패: {}", path.display()))?;
        print_report(&report);
        return Ok(());
    }

    let Some(dir) = dir else {
        bail!("--text, --file, --dir 중 하나를 지정해야 합니다");
    };

    let files = FileCollector::with_defaults().collect_directory(&dir)?;
    if files.is_empty() {
        println!("[!] 수집할 파일이 없습니다.");
        return Ok(());
    }

    let total_size: u64 = files.iter().map(|f| f.size).sum();
    println!("[*] 수집 대상: {} 파일 ({})", files.len(), format_bytes(total_size as usize));
    println!();

    let mut success_count = 0;
    let mut error_count = 0;
    let mut chunk_count = 0;

    for (i, collected) in files.iter().enumerate() {
        let file_name = collected
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown");

        print!(
            "[{}/{}] [{}] {}... ",
            i + 1,
            files.len(),
            collected.format.as_str().to_uppercase(),
            file_name
        );

        match assistant.ingest_file(&collected.path, doc_type).await {
            Ok(report) => {
                println!(
                    "완료 (청크 {}, 건너뜀 {})",
                    report.chunks_created, report.chunks_rejected
                );
                chunk_count += report.chunks_created;
                success_count += 1;
            }
            Err(e) => {
                println!("실패: {}", e);
                error_count += 1;
            }
        }
    }

    println!();
    println!(
        "[OK] 완료: 성공 {}, 실패 {}, 청크 {}",
        success_count, error_count, chunk_count
    );

    Ok(())
}

/// 질문 명령어 (ask)
async fn cmd_ask(settings: &Settings, question: &str, user: &str, json: bool) -> Result<()> {
    let (_store, assistant) = build_assistant(settings)?;

    let answer = assistant.ask(user, question).await.context("질문 처리 실패")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.response);
    println!();
    println!("[*] 신뢰도: {:.2}", answer.confidence_score);

    if !answer.sources.is_empty() {
        println!("[*] 출처: {}", answer.sources.join(", "));
    }

    if answer.requires_attention {
        match answer.ticket_id {
            Some(ref id) => println!("[!] 담당자 검토 요청됨 (티켓: {})", id),
            None => println!("[!] 담당자 검토가 필요하지만 티켓 생성에 실패했습니다"),
        }
    }

    Ok(())
}

/// 문서 목록 명령어 (documents)
fn cmd_documents(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let docs = store.list_documents().context("문서 목록 조회 실패")?;

    if docs.is_empty() {
        println!("[!] 저장된 문서가 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 문서 ({} 건):\n", docs.len());

    for doc in docs {
        println!("  [{}] {}", doc.doc_type, truncate_text(&doc.source, 60));
        println!(
            "        {} | {} chunks",
            doc.created_at.format("%Y-%m-%d %H:%M"),
            doc.chunk_count
        );
    }

    Ok(())
}

/// 전체 문서 삭제 명령어 (clear-documents)
fn cmd_clear_documents(settings: &Settings, yes: bool) -> Result<()> {
    if !yes {
        bail!("모든 문서를 삭제하려면 --yes를 지정하세요");
    }

    let store = open_store(settings)?;
    let deleted = store.delete_all_chunks().context("문서 삭제 실패")?;
    println!("[OK] 청크 {} 개 삭제됨", deleted);

    Ok(())
}

/// 티켓 목록 명령어 (tickets)
fn cmd_tickets(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let tickets = store.list_open_tickets().context("티켓 조회 실패")?;

    if tickets.is_empty() {
        println!("[OK] 답변 대기 중인 질문이 없습니다.");
        return Ok(());
    }

    println!("[!] 답변 대기 중인 질문 ({} 건):\n", tickets.len());

    for ticket in tickets {
        println!("  {}", ticket.id);
        println!("        질문: {}", truncate_text(&ticket.user_query, 80));
        println!(
            "        {} | 신뢰도 {:.2}",
            ticket.created_at.format("%Y-%m-%d %H:%M"),
            ticket.confidence_score
        );
        println!();
    }

    Ok(())
}

/// 티켓 답변 명령어 (respond)
fn cmd_respond(settings: &Settings, id: &str, response: &str) -> Result<()> {
    let store = open_store(settings)?;
    let ticket = store
        .respond_ticket(id, response)
        .with_context(|| format!("티켓 {} 답변 실패", id))?;

    println!("[OK] 티켓 {} 종료됨", ticket.id);
    println!("     질문: {}", truncate_text(&ticket.user_query, 80));

    Ok(())
}

/// 대화 기록 명령어 (conversations)
fn cmd_conversations(settings: &Settings, limit: usize) -> Result<()> {
    let store = open_store(settings)?;
    let conversations = store
        .recent_conversations(limit)
        .context("대화 기록 조회 실패")?;

    if conversations.is_empty() {
        println!("[!] 대화 기록이 없습니다.");
        return Ok(());
    }

    for conv in conversations {
        println!(
            "  {} [{}] 신뢰도 {:.2}",
            conv.created_at.format("%Y-%m-%d %H:%M"),
            conv.user_id,
            conv.confidence_score
        );
        println!("        Q: {}", truncate_text(&conv.message, 80));
        println!("        A: {}", truncate_text(&conv.response, 80));
        println!();
    }

    Ok(())
}

/// 통계 명령어 (stats)
fn cmd_stats(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let stats = store.stats().context("통계 조회 실패")?;
    let documents = store.list_documents().context("문서 목록 조회 실패")?;

    println!("[OK] 총 질문: {}", stats.total_queries);
    println!("     답변 대기: {}", stats.unanswered_count);
    println!("     평균 신뢰도: {:.2}", stats.avg_confidence);
    println!("     문서: {} ({} 청크)", documents.len(), stats.total_chunks);

    Ok(())
}

/// 상태 명령어 (status)
fn cmd_status(settings: &Settings) -> Result<()> {
    println!("investor-qa v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", settings.data_dir.display());
    println!(
        "[*] 임베딩: {:?} (차원 {})",
        settings.embedding_backend, settings.embedding_dimension
    );

    if settings.groq_api_key.is_some() {
        println!("[OK] Groq API 키: 설정됨 ({})", settings.groq_model);
    } else {
        println!("[!] Groq API 키: 미설정");
        println!("    설정: export GROQ_API_KEY=your-key");
    }

    match KnowledgeStore::open(&settings.db_path(), settings.embedding_dimension) {
        Ok(store) => match store.stats() {
            Ok(stats) => {
                println!("[OK] 저장된 청크: {} 개", stats.total_chunks);
                println!("     DB: {}", stats.db_path.display());
            }
            Err(e) => println!("[!] 통계 조회 실패: {}", e),
        },
        Err(e) => println!("[!] KnowledgeStore 열기 실패: {}", e),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_report(report: &IngestReport) {
    println!(
        "[OK] {}: 청크 {} 개 저장",
        report.source, report.chunks_created
    );
    if report.chunks_rejected > 0 {
        println!("[!] 임베딩 실패로 {} 개 건너뜀", report.chunks_rejected);
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 바이트 크기 포맷팅
fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
    }

    #[test]
    fn test_parse_ask_command() {
        let cli = Cli::try_parse_from([
            "investor-qa",
            "ask",
            "What is the lock-up period?",
            "--user",
            "lp-42",
        ])
        .unwrap();

        match cli.command {
            Commands::Ask {
                question,
                user,
                json,
            } => {
                assert_eq!(question, "What is the lock-up period?");
                assert_eq!(user, "lp-42");
                assert!(!json);
            }
            _ => panic!("expected ask command"),
        }
    }

    #[test]
    fn test_parse_ingest_defaults() {
        let cli = Cli::try_parse_from(["investor-qa", "ingest", "--text", "Fees are 2/20."]).unwrap();

        match cli.command {
            Commands::Ingest {
                text,
                source,
                doc_type,
                ..
            } => {
                assert_eq!(text.as_deref(), Some("Fees are 2/20."));
                assert_eq!(source, "direct-input");
                assert_eq!(doc_type, "faq");
            }
            _ => panic!("expected ingest command"),
        }
    }

    #[test]
    fn test_parse_respond_command() {
        let cli = Cli::try_parse_from(["investor-qa", "respond", "abc-123", "Yes, quarterly."]).unwrap();
        assert!(matches!(cli.command, Commands::Respond { ref id, .. } if id == "abc-123"));
    }
}
