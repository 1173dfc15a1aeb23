//! Sequential document batch uploads with per-file progress and
//! attempt-everything failure aggregation.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use sha2::{Digest, Sha256};
use shared::{
    domain::{ContextId, DocumentFile, UserId},
    error::{ApiError, ApiResult},
    protocol::ExecutionRequest,
};
use tokio::sync::broadcast;
use tracing::warn;

use crate::transport::ContextTransport;

/// Progress notifications emitted while a batch uploads.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    FileStarted {
        index: usize,
        total: usize,
        name: String,
    },
    EmbeddingProgress {
        name: String,
        percent: u8,
    },
    StorageStarted {
        name: String,
    },
    FileUploaded {
        name: String,
    },
    FileFailed {
        name: String,
        message: String,
    },
}

pub struct DocumentUploadCoordinator {
    transport: Arc<dyn ContextTransport>,
    events: broadcast::Sender<UploadEvent>,
}

impl DocumentUploadCoordinator {
    pub fn new(transport: Arc<dyn ContextTransport>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { transport, events }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    /// Uploads files strictly in input order, one at a time, so progress
    /// stays interpretable as "file X of N". A failing file is recorded and
    /// the batch moves on; the call fails afterwards if any file failed,
    /// with the per-file messages joined by `"; "`.
    pub async fn upload_all(
        &self,
        context_id: &ContextId,
        user_id: &UserId,
        files: &[DocumentFile],
    ) -> ApiResult<()> {
        let mut failures: Vec<String> = Vec::new();

        for (index, file) in files.iter().enumerate() {
            let _ = self.events.send(UploadEvent::FileStarted {
                index,
                total: files.len(),
                name: file.name.clone(),
            });

            match self.upload_one(context_id, user_id, file).await {
                Ok(()) => {
                    let _ = self.events.send(UploadEvent::FileUploaded {
                        name: file.name.clone(),
                    });
                }
                Err(err) => {
                    let message = format!("failed to upload '{}': {}", file.name, err.message);
                    warn!(
                        name = %file.name,
                        error = %err,
                        "document upload failed; continuing with remaining files"
                    );
                    let _ = self.events.send(UploadEvent::FileFailed {
                        name: file.name.clone(),
                        message: message.clone(),
                    });
                    failures.push(message);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ApiError::internal(failures.join("; ")))
        }
    }

    async fn upload_one(
        &self,
        context_id: &ContextId,
        user_id: &UserId,
        file: &DocumentFile,
    ) -> ApiResult<()> {
        let hash = hex_digest(&file.bytes);
        let _ = self.events.send(UploadEvent::EmbeddingProgress {
            name: file.name.clone(),
            percent: 100,
        });
        let _ = self.events.send(UploadEvent::StorageStarted {
            name: file.name.clone(),
        });

        self.transport
            .execute(ExecutionRequest {
                context_id: context_id.clone(),
                method: "upload_document".to_string(),
                args_json: json!({
                    "id": file.id,
                    "name": file.name,
                    "hash": hash,
                    "blob_b64": STANDARD.encode(&file.bytes),
                    "size": file.bytes.len() as u64,
                }),
                executor_id: user_id.clone(),
            })
            .await?;
        Ok(())
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
#[path = "tests/documents_tests.rs"]
mod tests;
