//! Orchestrates both deduplication stages into one processing decision.
//!
//! The stages fail closed; this boundary fails open. Any error escaping
//! the flow becomes `should_process = true` with a degraded result,
//! because silently dropping a legitimate invoice is judged worse than
//! occasionally reprocessing a duplicate.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::DedupConfig;
use crate::domain::extraction::{ExtractedField, ExtractionId, MatchType};
use crate::domain::file::{FileId, TenantId};
use crate::errors::DedupError;
use crate::file_dedup::{FileDeduplicationService, FileDuplicateResult};
use crate::invoice_dedup::{DuplicateResult, InvoiceDeduplicationService};
use crate::stores::{ExtractionStore, FileStore};

#[derive(Clone, Debug)]
pub struct FullDeduplicationRequest {
    pub tenant_id: TenantId,
    pub file_id: FileId,
    pub file_bytes: Vec<u8>,
    pub extraction_id: Option<ExtractionId>,
    pub extracted_fields: Option<HashMap<String, ExtractedField>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FullDeduplicationOutcome {
    pub file_result: FileDuplicateResult,
    pub invoice_result: Option<DuplicateResult>,
    pub should_process: bool,
}

impl FullDeduplicationOutcome {
    /// Degraded fail-open outcome used when the flow errors internally.
    fn degraded() -> Self {
        Self {
            file_result: FileDuplicateResult::unique(),
            invoice_result: None,
            should_process: true,
        }
    }
}

pub struct DeduplicationService {
    files: FileDeduplicationService,
    invoices: InvoiceDeduplicationService,
}

impl DeduplicationService {
    pub fn new(
        file_store: Arc<dyn FileStore>,
        extraction_store: Arc<dyn ExtractionStore>,
        config: DedupConfig,
    ) -> Result<Self, DedupError> {
        config.validate()?;
        Ok(Self {
            files: FileDeduplicationService::new(file_store),
            invoices: InvoiceDeduplicationService::new(extraction_store, config),
        })
    }

    pub fn file_service(&self) -> &FileDeduplicationService {
        &self.files
    }

    pub fn invoice_service(&self) -> &InvoiceDeduplicationService {
        &self.invoices
    }

    /// Runs stage 1 and, when extraction data is supplied, stage 2, and
    /// folds both into one processing decision. Infallible by design: any
    /// internal error degrades to "process it".
    pub async fn perform_full_deduplication(
        &self,
        request: FullDeduplicationRequest,
    ) -> FullDeduplicationOutcome {
        match self.run(&request).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    tenant = %request.tenant_id.0,
                    file = %request.file_id.0,
                    %error,
                    "deduplication failed, failing open"
                );
                FullDeduplicationOutcome::degraded()
            }
        }
    }

    async fn run(
        &self,
        request: &FullDeduplicationRequest,
    ) -> Result<FullDeduplicationOutcome, DedupError> {
        let hash = self
            .files
            .calculate_and_store_file_hash(&request.file_id, &request.file_bytes)
            .await?;
        let size = request.file_bytes.len() as i64;

        let file_result = self
            .files
            .check_file_duplicate(&request.tenant_id, &hash, size, Some(&request.file_id))
            .await?;

        // File-level exact duplicate short-circuits stage 2.
        if file_result.is_duplicate {
            return Ok(FullDeduplicationOutcome {
                file_result,
                invoice_result: None,
                should_process: false,
            });
        }

        let (Some(extraction_id), Some(extracted_fields)) =
            (&request.extraction_id, &request.extracted_fields)
        else {
            return Ok(FullDeduplicationOutcome {
                file_result,
                invoice_result: None,
                should_process: true,
            });
        };

        let invoice_result = self
            .invoices
            .check_invoice_duplicate(&request.tenant_id, extraction_id, extracted_fields)
            .await?;
        self.invoices.update_duplicate_status(extraction_id, &invoice_result).await?;

        // Possible matches are surfaced for review but do not block;
        // likely and exact ones do.
        let should_process =
            matches!(invoice_result.match_type, MatchType::Unique | MatchType::Possible);

        Ok(FullDeduplicationOutcome {
            file_result,
            invoice_result: Some(invoice_result),
            should_process,
        })
    }
}
