//! File batch upload orchestration.
//!
//! Uploads fan out concurrently and settle per file: successes are recorded,
//! failures are reported individually, and one bad file never discards the
//! rest of the batch. The uploader owns the uploaded-file list for the
//! lifetime of the session; removal is local-only and no backend deletion
//! call exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::FileBackend;
use crate::context::SessionContext;

/// File extensions accepted by the picker, lowercase without the dot.
///
/// UI hinting only; the backend is the authority on acceptance.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["cab", "cabx", "mzb", "xml"];

/// Provisional summary recorded until the backend finishes analysis.
pub const ANALYSIS_PENDING: &str = "Processing started. Results will be available soon.";

/// Guidance shown when a free-tier session tries to upload.
pub const UPLOAD_UPGRADE_GUIDANCE: &str = "Upgrade to Pro for file parsing and diagnostics. \
     Pro analyzes .cab, .cabx, .mzb, and .xml with a step-by-step fix plan.";

/// One file selected for upload.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Whether the file name carries one of the supported extensions.
    pub fn has_supported_extension(&self) -> bool {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

/// Result of one successfully uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Backend-assigned identifier.
    pub id: String,
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    pub mime_type: String,
    /// Backend processing state.
    pub status: String,
    /// Free text, filled once the backend computes results out of band.
    pub analysis_summary: String,
}

impl UploadedFile {
    /// Builds the record for a freshly accepted file with the provisional
    /// analysis placeholder.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            status: status.into(),
            analysis_summary: ANALYSIS_PENDING.to_string(),
        }
    }
}

/// One file that failed to upload, reported alongside the successes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub name: String,
    pub message: String,
}

/// Result of a [`FileBatchUploader::upload_batch`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The batch settled; successes were appended to the file list.
    Completed {
        uploaded: Vec<UploadedFile>,
        failures: Vec<UploadFailure>,
    },
    /// The plan gate blocked the batch; no network call was made.
    UpgradeRequired { guidance: String },
    /// The input collection was empty; no network call was made.
    Empty,
}

/// Dispatches concurrent upload batches against a [`FileBackend`].
///
/// Unlike the conversation path there is no single-flight lock here;
/// concurrent batches are allowed and tracked only for the uploading
/// indicator.
pub struct FileBatchUploader<B: FileBackend> {
    backend: Arc<B>,
    context: SessionContext,
    files: Arc<RwLock<Vec<UploadedFile>>>,
    active_batches: Arc<AtomicUsize>,
}

impl<B: FileBackend> FileBatchUploader<B> {
    pub fn new(backend: Arc<B>, context: SessionContext) -> Self {
        Self {
            backend,
            context,
            files: Arc::new(RwLock::new(Vec::new())),
            active_batches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The session context this uploader was built with.
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Whether at least one batch is currently outstanding.
    pub fn is_uploading(&self) -> bool {
        self.active_batches.load(Ordering::Acquire) > 0
    }

    /// Snapshot of the recorded files in append order.
    pub async fn files(&self) -> Vec<UploadedFile> {
        self.files.read().await.clone()
    }

    /// Removes a recorded file locally. Returns false when the id is
    /// unknown.
    pub async fn remove_file(&self, id: &str) -> bool {
        let mut files = self.files.write().await;
        let before = files.len();
        files.retain(|file| file.id != id);
        files.len() != before
    }

    /// Uploads a batch of files concurrently and settles them per file.
    ///
    /// The plan gate is consulted first: a tier without upload permission
    /// short-circuits to [`BatchOutcome::UpgradeRequired`] with zero network
    /// calls. Otherwise every file is dispatched at once; successes are
    /// appended to the file list together once the batch settles, failures
    /// are reported per file and never discard the successes.
    pub async fn upload_batch(&self, files: Vec<FileInput>) -> BatchOutcome {
        if !self.context.capabilities().uploads_allowed {
            debug!(plan = %self.context.plan, "upload blocked by plan gate");
            return BatchOutcome::UpgradeRequired {
                guidance: UPLOAD_UPGRADE_GUIDANCE.to_string(),
            };
        }
        if files.is_empty() {
            return BatchOutcome::Empty;
        }

        let _guard = BatchGuard::enter(&self.active_batches);
        let batch_id = Uuid::new_v4();
        debug!(%batch_id, count = files.len(), "dispatching upload batch");

        let results = join_all(files.iter().map(|file| {
            let cancel = self.context.cancel_token();
            async move {
                self.backend
                    .upload(file, cancel)
                    .await
                    .map_err(|err| UploadFailure {
                        name: file.name.clone(),
                        message: err.user_message(),
                    })
            }
        }))
        .await;

        let mut uploaded = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(file) => uploaded.push(file),
                Err(failure) => {
                    warn!(%batch_id, file = %failure.name, error = %failure.message, "file upload failed");
                    failures.push(failure);
                }
            }
        }

        if !uploaded.is_empty() {
            self.files.write().await.extend(uploaded.iter().cloned());
        }

        BatchOutcome::Completed { uploaded, failures }
    }
}

/// RAII handle for the outstanding-batch counter.
struct BatchGuard {
    counter: Arc<AtomicUsize>,
}

impl BatchGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
