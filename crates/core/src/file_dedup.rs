//! Stage 1: exact file-level deduplication by content hash and size.
//!
//! This stage fails closed: every storage error propagates, because an
//! indeterminate file hash must not silently pass as unique.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::file::{FileId, TenantId};
use crate::errors::DedupError;
use crate::hashing::content_hash;
use crate::stores::FileStore;

/// Outcome of an exact content lookup. Hash equality is treated as
/// certainty, so a hit always carries confidence 1.0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileDuplicateResult {
    pub is_duplicate: bool,
    pub duplicate_file_id: Option<FileId>,
    pub confidence: f64,
}

impl FileDuplicateResult {
    pub fn unique() -> Self {
        Self { is_duplicate: false, duplicate_file_id: None, confidence: 0.0 }
    }
}

/// Whether a file should continue through the pipeline, with a
/// human-readable reason when it should not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileProcessDecision {
    pub should_process: bool,
    pub reason: Option<String>,
    pub duplicate_file_id: Option<FileId>,
}

pub struct FileDeduplicationService {
    files: Arc<dyn FileStore>,
}

impl FileDeduplicationService {
    pub fn new(files: Arc<dyn FileStore>) -> Self {
        Self { files }
    }

    /// Looks for another file in the tenant with equal hash and size.
    pub async fn check_file_duplicate(
        &self,
        tenant: &TenantId,
        content_hash: &str,
        file_size_bytes: i64,
        exclude: Option<&FileId>,
    ) -> Result<FileDuplicateResult, DedupError> {
        let matches =
            self.files.find_by_content(tenant, content_hash, file_size_bytes, exclude).await?;

        match matches.into_iter().next() {
            Some(original) => {
                info!(
                    tenant = %tenant.0,
                    duplicate_of = %original.id.0,
                    "exact file duplicate detected"
                );
                Ok(FileDuplicateResult {
                    is_duplicate: true,
                    duplicate_file_id: Some(original.id),
                    confidence: 1.0,
                })
            }
            None => Ok(FileDuplicateResult::unique()),
        }
    }

    /// Computes and persists the content hash and byte size for a file.
    /// Recomputing over the same bytes writes the same values, so the call
    /// is idempotent in effect.
    pub async fn calculate_and_store_file_hash(
        &self,
        file_id: &FileId,
        bytes: &[u8],
    ) -> Result<String, DedupError> {
        let hash = content_hash(bytes)?;
        let size = bytes.len() as i64;
        self.files.update_hash_and_size(file_id, &hash, size).await?;
        debug!(file = %file_id.0, size, "stored content hash");
        Ok(hash)
    }

    /// Stage-1 processing decision for a file, excluding the file itself
    /// from the lookup.
    pub async fn should_process_file(
        &self,
        tenant: &TenantId,
        file_id: &FileId,
        content_hash: &str,
        file_size_bytes: i64,
    ) -> Result<FileProcessDecision, DedupError> {
        let result =
            self.check_file_duplicate(tenant, content_hash, file_size_bytes, Some(file_id)).await?;

        if result.is_duplicate {
            let duplicate_id = result.duplicate_file_id.clone();
            let reason = duplicate_id
                .as_ref()
                .map(|id| format!("exact duplicate of file {}", id.0))
                .unwrap_or_else(|| "exact duplicate of an existing file".to_string());
            return Ok(FileProcessDecision {
                should_process: false,
                reason: Some(reason),
                duplicate_file_id: duplicate_id,
            });
        }

        Ok(FileProcessDecision { should_process: true, reason: None, duplicate_file_id: None })
    }
}
