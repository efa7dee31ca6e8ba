use super::{with_timeout, Controller, ResetGuard};
use crate::error::Result;
use tracing::{info, warn};

pub const CLEAR_ALL_PROMPT: &str =
    "Are you sure you want to clear all data? This will remove the uploaded PDF and all conversations.";

/// The user's answer to [`CLEAR_ALL_PROMPT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Cancelled,
}

impl Controller {
    /// Resets the server-side thread first; local history is only dropped once
    /// the service has agreed.
    pub async fn start_new_conversation(&self) -> Result<()> {
        let _guard = self.acquire_reset()?;

        let receipt = with_timeout(self.config.control_timeout(), self.service.new_session())
            .await
            .inspect_err(|err| warn!(error = %err, "new session failed"))?;

        let mut session = self.session.lock();
        if let Some(thread_id) = receipt.thread_id {
            session.adopt_thread_id(thread_id);
        }
        session.clear_conversation();
        info!(thread_id = %session.thread_id(), "started new conversation");
        drop(session);
        Ok(())
    }

    /// Deletes the document and all server state. Nothing is sent unless the
    /// user confirmed.
    pub async fn clear_all_data(&self, confirmation: Confirmation) -> Result<ClearOutcome> {
        if confirmation == Confirmation::Declined {
            return Ok(ClearOutcome::Cancelled);
        }
        let _guard = self.acquire_reset()?;

        with_timeout(self.config.control_timeout(), self.service.clear_all())
            .await
            .inspect_err(|err| warn!(error = %err, "clear all failed"))?;

        self.session.lock().reset_all();
        info!("cleared all data");
        Ok(ClearOutcome::Cleared)
    }

    fn acquire_reset(&self) -> Result<ResetGuard> {
        ResetGuard::acquire(&self.session)
    }
}

pub fn new_conversation_notice(outcome: &Result<()>) -> String {
    match outcome {
        Ok(()) => "Started new conversation!".to_string(),
        Err(err) => format!("Failed to start new session: {}", err.user_message()),
    }
}

pub fn clear_all_notice(outcome: &Result<ClearOutcome>) -> Option<String> {
    match outcome {
        Ok(ClearOutcome::Cleared) => Some("All data cleared!".to_string()),
        Ok(ClearOutcome::Cancelled) => None,
        Err(err) => Some(format!("Failed to clear data: {}", err.user_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::{clear_all_notice, new_conversation_notice, ClearOutcome, Confirmation};
    use crate::config::ClientConfig;
    use crate::controller::test_support::FakeService;
    use crate::controller::upload::CandidateFile;
    use crate::controller::Controller;
    use crate::error::ClientError;
    use crate::service::{ChatReply, NewSessionReceipt, UploadReceipt, PDF_MIME};
    use crate::session::UploadState;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    async fn controller_with_history(fake: &Arc<FakeService>) -> Controller {
        fake.uploads.lock().push_back(Ok(UploadReceipt::default()));
        fake.replies.lock().push_back(Ok(ChatReply {
            answer: "answer".to_string(),
            ..ChatReply::default()
        }));
        let config = ClientConfig {
            thread_id: Some("thread-1".to_string()),
            ..ClientConfig::default()
        };
        let controller = Controller::new(fake.clone(), config);
        controller
            .submit(CandidateFile::from_bytes("paper.pdf", PDF_MIME, b"%PDF".to_vec()))
            .await
            .expect("upload should succeed");
        controller.ask("question").await;
        controller
    }

    #[tokio::test]
    async fn new_conversation_keeps_document_and_adopts_thread() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        fake.new_sessions.lock().push_back(Ok(NewSessionReceipt {
            thread_id: Some("session_ab12cd34".to_string()),
        }));

        let outcome = controller.start_new_conversation().await;
        assert_eq!(new_conversation_notice(&outcome), "Started new conversation!");

        let session = controller.snapshot();
        assert!(session.turns().is_empty());
        assert_eq!(session.upload_state(), UploadState::Ready);
        assert_eq!(session.document_name(), Some("paper.pdf"));
        assert_eq!(session.thread_id(), "session_ab12cd34");
    }

    #[tokio::test]
    async fn new_conversation_without_thread_keeps_current_one() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        fake.new_sessions
            .lock()
            .push_back(Ok(NewSessionReceipt::default()));

        controller
            .start_new_conversation()
            .await
            .expect("new session should succeed");
        assert_eq!(controller.snapshot().thread_id(), "thread-1");
    }

    #[tokio::test]
    async fn failed_new_conversation_keeps_history() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        fake.new_sessions
            .lock()
            .push_back(Err(ClientError::transport("connection refused")));

        let outcome = controller.start_new_conversation().await;
        assert_eq!(
            new_conversation_notice(&outcome),
            "Failed to start new session: connection refused"
        );
        assert_eq!(controller.snapshot().turns().len(), 2);
        assert!(controller.is_idle());
    }

    #[tokio::test]
    async fn declined_clear_all_sends_nothing() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;

        let outcome = controller.clear_all_data(Confirmation::Declined).await;
        assert_eq!(outcome, Ok(ClearOutcome::Cancelled));
        assert_eq!(clear_all_notice(&outcome), None);
        assert_eq!(fake.clear_calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.snapshot().turns().len(), 2);
    }

    #[tokio::test]
    async fn confirmed_clear_all_resets_session() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        fake.clears.lock().push_back(Ok(()));

        let outcome = controller.clear_all_data(Confirmation::Confirmed).await;
        assert_eq!(clear_all_notice(&outcome).as_deref(), Some("All data cleared!"));

        let session = controller.snapshot();
        assert_eq!(session.upload_state(), UploadState::NoDocument);
        assert!(session.document_name().is_none());
        assert!(session.turns().is_empty());
        assert!(session.passages().is_empty());
    }

    #[tokio::test]
    async fn failed_clear_all_leaves_session_unchanged() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        let before = controller.snapshot();
        fake.clears
            .lock()
            .push_back(Err(ClientError::transport("connection reset")));

        let outcome = controller.clear_all_data(Confirmation::Confirmed).await;
        assert_eq!(
            clear_all_notice(&outcome).as_deref(),
            Some("Failed to clear data: connection reset")
        );
        assert_eq!(controller.snapshot(), before);
    }

    #[tokio::test]
    async fn resets_are_refused_while_a_question_is_pending() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        let _pending = controller
            .begin_ask("in flight")
            .expect("question should start");

        assert_eq!(
            controller.start_new_conversation().await,
            Err(ClientError::Busy)
        );
        assert_eq!(
            controller.clear_all_data(Confirmation::Confirmed).await,
            Err(ClientError::Busy)
        );
        assert_eq!(fake.new_session_calls.load(Ordering::SeqCst), 0);
        assert_eq!(fake.clear_calls.load(Ordering::SeqCst), 0);
        assert!(!controller.is_resetting());
    }

    #[tokio::test]
    async fn questions_and_uploads_are_refused_while_a_reset_is_in_flight() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        let turns_before = controller.snapshot().turns().len();

        let guard = controller
            .acquire_reset()
            .expect("idle controller should accept a reset");
        assert!(controller.is_resetting());
        assert!(!controller.is_idle());

        assert!(controller.begin_ask("racing question").is_none());
        assert!(matches!(
            controller.begin_submit(CandidateFile::from_bytes(
                "other.pdf",
                PDF_MIME,
                b"%PDF".to_vec()
            )),
            Err(ClientError::Busy)
        ));
        assert_eq!(
            controller.start_new_conversation().await,
            Err(ClientError::Busy)
        );
        assert_eq!(controller.snapshot().turns().len(), turns_before);

        drop(guard);
        assert!(controller.is_idle());
        assert_eq!(fake.ask_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fake.upload_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_all_keeps_the_claim_until_it_returns() {
        let fake = Arc::new(FakeService::default());
        let controller = controller_with_history(&fake).await;
        fake.clears.lock().push_back(Ok(()));

        controller
            .clear_all_data(Confirmation::Confirmed)
            .await
            .expect("clear all should succeed");

        let session = controller.snapshot();
        assert_eq!(session.upload_state(), UploadState::NoDocument);
        assert!(session.turns().is_empty());
        assert!(!session.is_pending());
        assert!(controller.is_idle());
    }
}
