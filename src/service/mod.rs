//! Remote question-answering service seam.
//!
//! The controllers only talk to [`RagService`]; `http` holds the production
//! implementation and tests substitute a scripted fake.

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

pub mod http;

pub const PDF_MIME: &str = "application/pdf";

#[async_trait]
pub trait RagService: Send + Sync {
    /// `POST /upload-pdf` with the raw document bytes as multipart field `file`.
    async fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadReceipt>;

    /// `POST /chat`.
    async fn ask(&self, question: &str, thread_id: &str) -> Result<ChatReply>;

    /// `POST /new-session`.
    async fn new_session(&self) -> Result<NewSessionReceipt>;

    /// `DELETE /clear-all`.
    async fn clear_all(&self) -> Result<()>;

    /// `GET /health`.
    async fn health(&self) -> Result<HealthStatus>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub chunks_created: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    #[serde(default)]
    pub source_documents: Option<Vec<SourceDocument>>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub chunk_id: Option<ChunkId>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl SourceDocument {
    pub fn header(&self, key: &str) -> Option<String> {
        self.metadata
            .as_ref()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Chunk identifiers arrive either as JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChunkId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewSessionReceipt {
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pdf_uploaded: bool,
    #[serde(default)]
    pub graph_initialized: bool,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatReply, ChunkId};

    #[test]
    fn chat_reply_accepts_numeric_and_string_chunk_ids() {
        let reply: ChatReply = serde_json::from_str(
            r#"{
  "answer": "X causes Y.",
  "thread_id": "client_1",
  "source_documents": [
    {"chunk_id": 1, "content": "first", "metadata": {"Header 1": "Results"}},
    {"chunk_id": "c-7", "content": "second"},
    {"content": "third", "metadata": {"source": "paper.pdf"}}
  ]
}"#,
        )
        .expect("chat reply should parse");

        let documents = reply.source_documents.expect("documents should be present");
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0].chunk_id, Some(ChunkId::Number(1)));
        assert_eq!(documents[1].chunk_id, Some(ChunkId::Text("c-7".to_string())));
        assert_eq!(documents[2].chunk_id, None);
        assert_eq!(documents[0].header("Header 1").as_deref(), Some("Results"));
        assert_eq!(documents[2].header("Header 1"), None);
    }

    #[test]
    fn chat_reply_tolerates_null_source_documents() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"answer": "ok", "source_documents": null}"#)
                .expect("null documents should parse");
        assert!(reply.source_documents.is_none());
    }

    #[test]
    fn header_ignores_non_string_values() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"answer": "ok", "source_documents": [{"content": "x", "metadata": {"Header 2": 3}}]}"#,
        )
        .expect("reply should parse");
        let documents = reply.source_documents.unwrap_or_default();
        assert_eq!(documents[0].header("Header 2"), None);
    }
}
