use super::{with_timeout, Controller};
use crate::event::AppEvent;
use eframe::egui;
use std::sync::mpsc;
use tokio::runtime::Handle;
use tokio::time;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    #[default]
    Unknown,
    Healthy {
        document_indexed: bool,
    },
    Degraded(String),
    Unreachable(String),
}

impl ServiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Checking service...",
            Self::Healthy { .. } => "Service Online",
            Self::Degraded(_) => "Service Degraded",
            Self::Unreachable(_) => "Service Offline",
        }
    }
}

impl Controller {
    /// Health never touches the session or its pending flag.
    pub async fn probe_health(&self) -> ServiceStatus {
        match with_timeout(self.config.control_timeout(), self.service.health()).await {
            Ok(health) if health.is_healthy() => ServiceStatus::Healthy {
                document_indexed: health.pdf_uploaded,
            },
            Ok(health) => ServiceStatus::Degraded(health.status),
            Err(err) => ServiceStatus::Unreachable(err.user_message()),
        }
    }

    /// Polls `/health` and reports only status changes.
    pub fn spawn_health_poller(
        &self,
        runtime_handle: &Handle,
        tx: mpsc::Sender<AppEvent>,
        ctx: egui::Context,
    ) {
        let controller = self.clone();
        runtime_handle.spawn(async move {
            let mut ticker = time::interval(controller.config.health_poll_interval());
            let mut last_status = ServiceStatus::Unknown;

            loop {
                ticker.tick().await;
                let status = controller.probe_health().await;
                debug!(?status, "health probe");
                if status != last_status {
                    last_status = status.clone();
                    if tx.send(AppEvent::StatusChanged(status)).is_err() {
                        break;
                    }
                    ctx.request_repaint();
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceStatus;
    use crate::config::ClientConfig;
    use crate::controller::test_support::FakeService;
    use crate::controller::Controller;
    use crate::service::HealthStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn probe_maps_health_payloads() {
        let fake = Arc::new(FakeService::default());
        fake.health.lock().push_back(Ok(HealthStatus {
            status: "healthy".to_string(),
            pdf_uploaded: true,
            graph_initialized: true,
        }));
        fake.health.lock().push_back(Ok(HealthStatus {
            status: "starting".to_string(),
            ..HealthStatus::default()
        }));
        let controller = Controller::new(fake.clone(), ClientConfig::default());

        assert_eq!(
            controller.probe_health().await,
            ServiceStatus::Healthy {
                document_indexed: true
            }
        );
        assert_eq!(
            controller.probe_health().await,
            ServiceStatus::Degraded("starting".to_string())
        );
        assert!(matches!(
            controller.probe_health().await,
            ServiceStatus::Unreachable(_)
        ));
    }

    #[tokio::test]
    async fn probe_leaves_session_untouched() {
        let fake = Arc::new(FakeService::default());
        let controller = Controller::new(fake.clone(), ClientConfig::default());
        let before = controller.snapshot();
        controller.probe_health().await;
        assert_eq!(controller.snapshot(), before);
        assert_eq!(fake.total_calls(), 0);
    }
}
