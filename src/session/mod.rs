//! Client-side session state: upload lifecycle, conversation log, and the
//! source passages of the latest answer.
//!
//! All mutation goes through the methods below so the invariants hold at every
//! point a reader can observe:
//! - `Ready` implies a document name is set.
//! - `NoDocument` implies no turns and no passages.
//! - passages and expansion flags are replaced together with the assistant turn.

use crate::error::{ClientError, Result};
use crate::service::{ChunkId, SourceDocument};
use std::collections::BTreeSet;

pub const SECTION_HEADER_KEY: &str = "Header 1";
pub const SUBSECTION_HEADER_KEY: &str = "Header 2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    NoDocument,
    Uploading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Upload,
    Question,
    /// New conversation or clear-all.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePassage {
    pub chunk_id: Option<ChunkId>,
    pub content: String,
    pub section_label: Option<String>,
    pub subsection_label: Option<String>,
}

impl SourcePassage {
    /// Chunk id when the service sent a usable one, else the 1-based position.
    pub fn label(&self, position: usize) -> String {
        match &self.chunk_id {
            Some(ChunkId::Text(text)) if text.trim().is_empty() => (position + 1).to_string(),
            Some(chunk_id) => chunk_id.to_string(),
            None => (position + 1).to_string(),
        }
    }
}

impl From<SourceDocument> for SourcePassage {
    fn from(document: SourceDocument) -> Self {
        let section_label = document.header(SECTION_HEADER_KEY);
        let subsection_label = document.header(SUBSECTION_HEADER_KEY);
        Self {
            chunk_id: document.chunk_id,
            content: document.content,
            section_label,
            subsection_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    upload_state: UploadState,
    document_name: Option<String>,
    turns: Vec<Turn>,
    passages: Vec<SourcePassage>,
    expanded: BTreeSet<usize>,
    /// Bumped whenever `passages` is replaced; views key their widgets on it.
    passage_generation: u64,
    pending: Option<PendingKind>,
    thread_id: String,
}

impl Session {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            upload_state: UploadState::NoDocument,
            document_name: None,
            turns: Vec::new(),
            passages: Vec::new(),
            expanded: BTreeSet::new(),
            passage_generation: 0,
            pending: None,
            thread_id: thread_id.into(),
        }
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload_state
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn passages(&self) -> &[SourcePassage] {
        &self.passages
    }

    pub fn passage_generation(&self) -> u64 {
        self.passage_generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<PendingKind> {
        self.pending
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn is_expanded(&self, position: usize) -> bool {
        self.expanded.contains(&position)
    }

    /// Flips the expansion flag of the passage at `position` and returns the new
    /// value. Positions outside the current passage list are ignored.
    pub fn toggle_passage(&mut self, position: usize) -> Option<bool> {
        if position >= self.passages.len() {
            return None;
        }
        if self.expanded.remove(&position) {
            Some(false)
        } else {
            self.expanded.insert(position);
            Some(true)
        }
    }

    pub fn begin_upload(&mut self) -> Result<()> {
        if self.is_pending() {
            return Err(ClientError::Busy);
        }
        self.pending = Some(PendingKind::Upload);
        self.upload_state = UploadState::Uploading;
        Ok(())
    }

    pub fn complete_upload(&mut self, document_name: impl Into<String>) {
        self.upload_state = UploadState::Ready;
        self.document_name = Some(document_name.into());
        self.clear_conversation();
        self.pending = None;
    }

    /// The service discards the previous document before ingesting, so a
    /// failed upload always lands in `NoDocument`.
    pub fn fail_upload(&mut self) {
        self.upload_state = UploadState::NoDocument;
        self.document_name = None;
        self.clear_conversation();
        self.pending = None;
    }

    /// Phase one of a question: appends the user turn and marks the session
    /// pending. Returns the trimmed question, or `None` when nothing may be sent.
    pub fn begin_question(&mut self, question: &str) -> Option<String> {
        let question = question.trim();
        if question.is_empty() || self.is_pending() || self.upload_state != UploadState::Ready {
            return None;
        }
        self.turns.push(Turn::user(question));
        self.pending = Some(PendingKind::Question);
        Some(question.to_string())
    }

    pub fn complete_question(&mut self, answer: impl Into<String>, passages: Vec<SourcePassage>) {
        self.turns.push(Turn::assistant(answer));
        self.replace_passages(passages);
        self.pending = None;
    }

    pub fn fail_question(&mut self, message: impl Into<String>) {
        self.turns.push(Turn::assistant(message));
        self.replace_passages(Vec::new());
        self.pending = None;
    }

    /// Claims the session for a reset. Uploads and questions are refused until
    /// [`Session::end_reset`].
    pub fn begin_reset(&mut self) -> Result<()> {
        if self.is_pending() {
            return Err(ClientError::Busy);
        }
        self.pending = Some(PendingKind::Reset);
        Ok(())
    }

    pub fn end_reset(&mut self) {
        if self.pending == Some(PendingKind::Reset) {
            self.pending = None;
        }
    }

    /// Local half of "new conversation": the document stays active.
    pub fn clear_conversation(&mut self) {
        self.turns.clear();
        self.replace_passages(Vec::new());
    }

    /// Local half of "clear all". The conversation identifier survives because
    /// it belongs to this client instance, not to the document. A reset claim
    /// stays in place until the caller ends it.
    pub fn reset_all(&mut self) {
        let thread_id = std::mem::take(&mut self.thread_id);
        let passage_generation = self.passage_generation + 1;
        let pending = self.pending;
        *self = Self::new(thread_id);
        self.passage_generation = passage_generation;
        self.pending = pending;
    }

    pub fn adopt_thread_id(&mut self, thread_id: impl Into<String>) {
        let thread_id = thread_id.into();
        if !thread_id.trim().is_empty() {
            self.thread_id = thread_id;
        }
    }

    fn replace_passages(&mut self, passages: Vec<SourcePassage>) {
        self.passages = passages;
        self.expanded.clear();
        self.passage_generation += 1;
    }
}
