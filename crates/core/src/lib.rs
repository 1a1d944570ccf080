//! Tenant-scoped document deduplication engine.
//!
//! Two stages: exact file-level matching on content hash + size, then
//! invoice-level matching (canonical fingerprint, falling back to fuzzy
//! multi-factor scoring). The orchestrator in [`pipeline`] folds both into
//! a single "should this document be processed further?" decision.

pub mod config;
pub mod domain;
pub mod errors;
pub mod file_dedup;
pub mod hashing;
pub mod invoice_dedup;
pub mod memory;
pub mod pipeline;
pub mod scoring;
pub mod stores;

pub use config::{DedupConfig, MatchThresholds, ScoringWeights};
pub use domain::{
    DocumentType, DuplicateStatus, ExtractedField, ExtractionId, ExtractionRecord, FileId,
    FileRecord, InvoiceData, MatchType, SimilarityScores, TenantId,
};
pub use errors::DedupError;
pub use file_dedup::{FileDeduplicationService, FileDuplicateResult, FileProcessDecision};
pub use invoice_dedup::{DuplicateResult, InvoiceDeduplicationService};
pub use memory::{MemoryExtractionStore, MemoryFileStore};
pub use pipeline::{DeduplicationService, FullDeduplicationOutcome, FullDeduplicationRequest};
pub use stores::{CandidateQuery, DuplicateFields, ExtractionStore, FileStore};
