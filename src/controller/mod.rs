//! Operations that drive the [`Session`] through remote calls.
//!
//! Each user-facing operation is split into a synchronous first phase that
//! validates input and marks the session (run on the UI thread) and an async
//! second phase that awaits the service and applies the outcome in one lock.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::service::RagService;
use crate::session::{PendingKind, Session};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub mod conversation;
pub mod health;
pub mod reset;
pub mod upload;

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Clone)]
pub struct Controller {
    service: Arc<dyn RagService>,
    session: SharedSession,
    config: Arc<ClientConfig>,
}

impl Controller {
    pub fn new(service: Arc<dyn RagService>, config: ClientConfig) -> Self {
        let session = Session::new(config.resolve_thread_id());
        Self {
            service,
            session: Arc::new(Mutex::new(session)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Copy of the current session for rendering. Never hold the lock across a frame.
    pub fn snapshot(&self) -> Session {
        self.session.lock().clone()
    }

    pub fn toggle_passage(&self, position: usize) -> Option<bool> {
        self.session.lock().toggle_passage(position)
    }

    pub fn is_resetting(&self) -> bool {
        self.session.lock().pending() == Some(PendingKind::Reset)
    }

    /// True when no upload, question or reset is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.session.lock().is_pending()
    }
}

/// Holds the session's reset claim for as long as the guard lives. The claim
/// shares the session's pending slot, so it is taken under the same lock that
/// uploads and questions check.
struct ResetGuard {
    session: SharedSession,
}

impl ResetGuard {
    fn acquire(session: &SharedSession) -> Result<Self> {
        session.lock().begin_reset()?;
        Ok(Self {
            session: Arc::clone(session),
        })
    }
}

impl Drop for ResetGuard {
    fn drop(&mut self) {
        self.session.lock().end_reset();
    }
}

async fn with_timeout<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::transport(format!(
            "timeout of {}ms exceeded",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::error::{ClientError, Result};
    use crate::service::{ChatReply, HealthStatus, NewSessionReceipt, RagService, UploadReceipt};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted [`RagService`]: replies are popped per call, an empty queue
    /// answers with a transport failure.
    #[derive(Default)]
    pub struct FakeService {
        pub uploads: Mutex<VecDeque<Result<UploadReceipt>>>,
        pub replies: Mutex<VecDeque<Result<ChatReply>>>,
        pub new_sessions: Mutex<VecDeque<Result<NewSessionReceipt>>>,
        pub clears: Mutex<VecDeque<Result<()>>>,
        pub health: Mutex<VecDeque<Result<HealthStatus>>>,
        pub ask_delay: Mutex<Option<Duration>>,
        pub upload_delay: Mutex<Option<Duration>>,
        pub upload_calls: AtomicUsize,
        pub ask_calls: AtomicUsize,
        pub new_session_calls: AtomicUsize,
        pub clear_calls: AtomicUsize,
        pub asked: Mutex<Vec<(String, String)>>,
        pub uploaded: Mutex<Vec<(String, usize)>>,
    }

    impl FakeService {
        pub fn total_calls(&self) -> usize {
            self.upload_calls.load(Ordering::SeqCst)
                + self.ask_calls.load(Ordering::SeqCst)
                + self.new_session_calls.load(Ordering::SeqCst)
                + self.clear_calls.load(Ordering::SeqCst)
        }
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T>>>) -> Result<T> {
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("no scripted response")))
    }

    #[async_trait]
    impl RagService for FakeService {
        async fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadReceipt> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            self.uploaded.lock().push((file_name.to_string(), bytes.len()));
            let delay = *self.upload_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            pop(&self.uploads)
        }

        async fn ask(&self, question: &str, thread_id: &str) -> Result<ChatReply> {
            self.ask_calls.fetch_add(1, Ordering::SeqCst);
            self.asked
                .lock()
                .push((question.to_string(), thread_id.to_string()));
            let delay = *self.ask_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            pop(&self.replies)
        }

        async fn new_session(&self) -> Result<NewSessionReceipt> {
            self.new_session_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.new_sessions)
        }

        async fn clear_all(&self) -> Result<()> {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            pop(&self.clears)
        }

        async fn health(&self) -> Result<HealthStatus> {
            pop(&self.health)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeService;
    use super::{with_timeout, Controller, ResetGuard};
    use crate::config::ClientConfig;
    use crate::error::ClientError;
    use crate::session::{PendingKind, Session};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn with_timeout_reports_limit_in_milliseconds() {
        let result: Result<(), ClientError> = with_timeout(Duration::from_secs(60), async {
            tokio::time::sleep(Duration::from_secs(61)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result,
            Err(ClientError::transport("timeout of 60000ms exceeded"))
        );
    }

    #[test]
    fn reset_guard_is_exclusive_and_released_on_drop() {
        let session = Arc::new(Mutex::new(Session::new("thread-1")));
        let guard = ResetGuard::acquire(&session).expect("first acquire should succeed");
        assert_eq!(session.lock().pending(), Some(PendingKind::Reset));
        assert!(matches!(ResetGuard::acquire(&session), Err(ClientError::Busy)));
        drop(guard);
        assert!(!session.lock().is_pending());
    }

    #[test]
    fn new_controller_uses_configured_thread_id() {
        let config = ClientConfig {
            thread_id: Some("desk_7".to_string()),
            ..ClientConfig::default()
        };
        let controller = Controller::new(Arc::new(FakeService::default()), config);
        assert_eq!(controller.snapshot().thread_id(), "desk_7");
        assert!(controller.is_idle());
    }
}
