use super::{with_timeout, Controller};
use crate::error::{ClientError, Result};
use crate::service::{UploadReceipt, PDF_MIME};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
enum FileSource {
    Bytes(Arc<[u8]>),
    Path(PathBuf),
}

/// A document offered by the user, before any validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub content_type: String,
    source: FileSource,
}

impl CandidateFile {
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            source: FileSource::Bytes(bytes.into()),
        }
    }

    /// Content type is guessed from the extension, the way a browser declares it.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_string();
        Some(Self {
            content_type: guess_content_type(path),
            name,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Drop entry point. Drops that carry neither a path nor bytes are not files.
    pub fn from_dropped(file: &egui::DroppedFile) -> Option<Self> {
        let declared = file.mime.trim();
        if let Some(bytes) = &file.bytes {
            let name = if file.name.is_empty() {
                file.path
                    .as_deref()
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().to_string())?
            } else {
                file.name.clone()
            };
            let content_type = if declared.is_empty() {
                guess_content_type(Path::new(&name))
            } else {
                declared.to_string()
            };
            return Some(Self::from_bytes(name, content_type, Arc::clone(bytes)));
        }

        let mut candidate = Self::from_path(file.path.as_deref()?)?;
        if !declared.is_empty() {
            candidate.content_type = declared.to_string();
        }
        Some(candidate)
    }

    /// Manual pick entry point: a path typed or pasted by the user.
    pub fn from_picked(input: &str) -> Option<Self> {
        let input = input.trim().trim_matches('"');
        if input.is_empty() {
            return None;
        }
        Self::from_path(Path::new(input))
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_MIME
    }

    async fn load(&self) -> Result<Vec<u8>> {
        match &self.source {
            FileSource::Bytes(bytes) => Ok(bytes.to_vec()),
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|err| ClientError::UnreadableFile {
                        name: self.name.clone(),
                        message: err.to_string(),
                    })
            }
        }
    }
}

fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// An upload that passed validation and holds the session's pending flag.
#[derive(Debug)]
pub struct PendingUpload {
    file: CandidateFile,
}

impl PendingUpload {
    pub fn file_name(&self) -> &str {
        &self.file.name
    }
}

impl Controller {
    /// Validates the file and moves the session to `Uploading`. Fails without
    /// touching the session when the type is wrong or another call is pending.
    pub fn begin_submit(&self, file: CandidateFile) -> Result<PendingUpload> {
        if !file.is_pdf() {
            warn!(name = %file.name, content_type = %file.content_type, "rejected non-PDF upload");
            return Err(ClientError::InvalidFileType {
                name: file.name,
                content_type: file.content_type,
            });
        }
        self.session.lock().begin_upload()?;
        info!(name = %file.name, "uploading document");
        Ok(PendingUpload { file })
    }

    /// Sends the document and settles the session. The pending flag is always
    /// cleared, whichever way the call ends.
    pub async fn finish_submit(&self, pending: PendingUpload) -> Result<UploadReceipt> {
        let outcome = self.ingest(&pending.file).await;

        let mut session = self.session.lock();
        match outcome {
            Ok(receipt) => {
                session.complete_upload(pending.file.name.clone());
                info!(name = %pending.file.name, chunks = ?receipt.chunks_created, "document ready");
                Ok(receipt)
            }
            Err(err) => {
                session.fail_upload();
                warn!(name = %pending.file.name, error = %err, "upload failed");
                Err(err)
            }
        }
    }

    pub async fn submit(&self, file: CandidateFile) -> Result<UploadReceipt> {
        let pending = self.begin_submit(file)?;
        self.finish_submit(pending).await
    }

    async fn ingest(&self, file: &CandidateFile) -> Result<UploadReceipt> {
        let bytes = file.load().await?;
        if bytes.len() as u64 > self.config.max_upload_bytes {
            warn!(
                name = %file.name,
                size = bytes.len(),
                limit = self.config.max_upload_bytes,
                "document exceeds advertised upload limit, sending anyway"
            );
        }

        with_timeout(
            self.config.upload_timeout(),
            self.service.upload_document(&file.name, bytes),
        )
        .await
    }
}

pub fn upload_succeeded_notice(name: &str, receipt: &UploadReceipt) -> String {
    match receipt.chunks_created {
        Some(chunks) => format!("Successfully processed: {name} ({chunks} chunks)"),
        None => format!("Successfully processed: {name}"),
    }
}

pub fn upload_failed_notice(error: &ClientError) -> String {
    match error {
        ClientError::InvalidFileType { .. } => "Please select a PDF file".to_string(),
        other => format!("Upload failed: {}", other.user_message()),
    }
}
