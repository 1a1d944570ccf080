//! Storage ports the engine depends on. Implementations live outside the
//! core crate (SQL in `docdup-db`, in-memory in [`crate::memory`]).

use async_trait::async_trait;

use crate::domain::extraction::{DuplicateStatus, ExtractionId, ExtractionRecord};
use crate::domain::file::{FileId, FileRecord, TenantId};
use crate::errors::DedupError;

/// Fuzzy candidate lookup parameters.
///
/// A candidate qualifies when its normalized vendor name contains
/// `vendor_name_like` (itself normalized text) OR its normalized invoice
/// number equals `invoice_number`. Implementations restrict results to
/// fuzzy-eligible document types, exclude `exclude`, order newest first
/// and cap at `limit`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateQuery {
    pub vendor_name_like: Option<String>,
    pub invoice_number: Option<String>,
    pub exclude: Option<ExtractionId>,
    pub limit: usize,
}

/// Engine-owned extraction fields written back after a check.
#[derive(Clone, Debug, PartialEq)]
pub struct DuplicateFields {
    pub fingerprint: Option<String>,
    pub confidence: f64,
    pub candidate_id: Option<ExtractionId>,
    pub status: DuplicateStatus,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// All files in the tenant with the given content hash and size,
    /// excluding `exclude` when set.
    async fn find_by_content(
        &self,
        tenant: &TenantId,
        content_hash: &str,
        file_size_bytes: i64,
        exclude: Option<&FileId>,
    ) -> Result<Vec<FileRecord>, DedupError>;

    async fn update_hash_and_size(
        &self,
        file_id: &FileId,
        content_hash: &str,
        file_size_bytes: i64,
    ) -> Result<(), DedupError>;
}

#[async_trait]
pub trait ExtractionStore: Send + Sync {
    async fn get(&self, id: &ExtractionId) -> Result<Option<ExtractionRecord>, DedupError>;

    /// Extractions in the tenant sharing `fingerprint`, excluding
    /// `exclude` when set, oldest first.
    async fn find_by_fingerprint(
        &self,
        tenant: &TenantId,
        fingerprint: &str,
        exclude: Option<&ExtractionId>,
    ) -> Result<Vec<ExtractionRecord>, DedupError>;

    async fn find_candidates(
        &self,
        tenant: &TenantId,
        query: &CandidateQuery,
    ) -> Result<Vec<ExtractionRecord>, DedupError>;

    async fn update_duplicate_fields(
        &self,
        id: &ExtractionId,
        fields: &DuplicateFields,
    ) -> Result<(), DedupError>;

    /// Every extraction sharing `fingerprint` across the store, ordered by
    /// creation time ascending. Tenant scoping is implied: fingerprints
    /// are only ever looked up through records of one tenant.
    async fn chain_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Vec<ExtractionRecord>, DedupError>;
}
