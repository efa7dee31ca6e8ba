use super::{with_timeout, Controller};
use crate::error::ClientError;
use crate::session::SourcePassage;
use tracing::{info, warn};

pub const ERROR_REPLY_PREFIX: &str = "Sorry, I encountered an error: ";

/// A question whose user turn is already in the log.
#[derive(Debug)]
pub struct PendingQuestion {
    question: String,
    thread_id: String,
}

impl PendingQuestion {
    pub fn question(&self) -> &str {
        &self.question
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Empty question, no document, or another call pending. Nothing changed.
    Skipped,
    Answered { passages: usize },
    Failed(ClientError),
}

impl Controller {
    /// Appends the user turn and marks the session pending. The caller clears
    /// its input buffer only when this returns `Some`.
    pub fn begin_ask(&self, question: &str) -> Option<PendingQuestion> {
        let mut session = self.session.lock();
        let question = session.begin_question(question)?;
        Some(PendingQuestion {
            question,
            thread_id: session.thread_id().to_string(),
        })
    }

    /// Awaits the answer and appends exactly one assistant turn. Passages are
    /// swapped under the same lock as the turn.
    pub async fn finish_ask(&self, pending: PendingQuestion) -> AskOutcome {
        info!(thread_id = %pending.thread_id, "asking question");
        let result = with_timeout(
            self.config.chat_timeout(),
            self.service.ask(&pending.question, &pending.thread_id),
        )
        .await;

        let mut session = self.session.lock();
        match result {
            Ok(reply) => {
                let passages: Vec<SourcePassage> = reply
                    .source_documents
                    .unwrap_or_default()
                    .into_iter()
                    .map(SourcePassage::from)
                    .collect();
                let count = passages.len();
                session.complete_question(reply.answer, passages);
                info!(passages = count, "answer received");
                AskOutcome::Answered { passages: count }
            }
            Err(err) => {
                warn!(error = %err, "question failed");
                session.fail_question(error_reply(&err));
                AskOutcome::Failed(err)
            }
        }
    }

    pub async fn ask(&self, question: &str) -> AskOutcome {
        match self.begin_ask(question) {
            Some(pending) => self.finish_ask(pending).await,
            None => AskOutcome::Skipped,
        }
    }
}

pub fn error_reply(error: &ClientError) -> String {
    format!("{ERROR_REPLY_PREFIX}{}", error.user_message())
}
