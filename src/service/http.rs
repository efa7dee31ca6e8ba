use super::{
    ChatReply, HealthStatus, NewSessionReceipt, RagService, UploadReceipt, PDF_MIME,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
    thread_id: &'a str,
}

#[derive(Clone)]
pub struct HttpRagService {
    client: Client,
    base_url: String,
}

impl HttpRagService {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|err| ClientError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl RagService for HttpRagService {
    async fn upload_document(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadReceipt> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload-pdf"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn ask(&self, question: &str, thread_id: &str) -> Result<ChatReply> {
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&ChatRequest {
                question,
                thread_id,
            })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<ChatReply>().await?)
    }

    async fn new_session(&self) -> Result<NewSessionReceipt> {
        let response = self.client.post(self.url("/new-session")).send().await?;
        let response = ensure_success(response).await?;

        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    async fn clear_all(&self) -> Result<()> {
        let response = self.client.delete(self.url("/clear-all")).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("/health")).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<HealthStatus>().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match extract_detail(&body) {
        Some(detail) => Err(ClientError::service(status, detail)),
        None => Err(ClientError::transport(format!(
            "Request failed with status code {}",
            status.as_u16()
        ))),
    }
}

/// Pulls the `detail` field out of a best-effort JSON error body.
fn extract_detail(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    match payload.get("detail")? {
        Value::Null => None,
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_detail, HttpRagService};
    use crate::config::ClientConfig;

    #[test]
    fn extract_detail_reads_string_detail() {
        let detail = extract_detail(r#"{"detail": "Only PDF files are allowed"}"#);
        assert_eq!(detail.as_deref(), Some("Only PDF files are allowed"));
    }

    #[test]
    fn extract_detail_serializes_structured_detail() {
        let detail = extract_detail(r#"{"detail": [{"loc": ["body"], "msg": "field required"}]}"#)
            .expect("structured detail should be kept");
        assert!(detail.contains("field required"));
    }

    #[test]
    fn extract_detail_returns_none_without_detail() {
        assert_eq!(extract_detail(r#"{"error": "boom"}"#), None);
        assert_eq!(extract_detail(r#"{"detail": null}"#), None);
        assert_eq!(extract_detail("<html>Bad Gateway</html>"), None);
        assert_eq!(extract_detail(""), None);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = ClientConfig {
            api_base_url: "http://localhost:8000/".to_string(),
            ..ClientConfig::default()
        };
        let service = HttpRagService::new(&config).expect("client should build");
        assert_eq!(service.url("/chat"), "http://localhost:8000/chat");
    }
}
