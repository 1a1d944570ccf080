//! Stage 2: invoice-level deduplication.
//!
//! Exact fingerprint lookup first; only when that misses does the fuzzy
//! stage run, and only when the extraction carries an anchor field
//! (vendor name or invoice number) to search on. Lookup errors propagate;
//! the fail-open decision belongs to the orchestrator, not here.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DedupConfig;
use crate::domain::extraction::{ExtractedField, ExtractionId, ExtractionRecord, MatchType};
use crate::domain::file::TenantId;
use crate::domain::invoice::{InvoiceData, SimilarityScores};
use crate::errors::DedupError;
use crate::hashing::{invoice_fingerprint, normalize_vendor};
use crate::scoring::similarity_scores;
use crate::stores::{CandidateQuery, DuplicateFields, ExtractionStore};

/// Outcome of a single invoice duplicate check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuplicateResult {
    pub match_type: MatchType,
    pub duplicate_extraction_id: Option<ExtractionId>,
    pub fingerprint: Option<String>,
    pub confidence: f64,
    pub scores: Option<SimilarityScores>,
}

impl DuplicateResult {
    pub fn is_duplicate(&self) -> bool {
        self.match_type.is_duplicate()
    }

    fn unique(fingerprint: Option<String>) -> Self {
        Self {
            match_type: MatchType::Unique,
            duplicate_extraction_id: None,
            fingerprint,
            confidence: 0.0,
            scores: None,
        }
    }
}

pub struct InvoiceDeduplicationService {
    extractions: Arc<dyn ExtractionStore>,
    config: DedupConfig,
}

impl InvoiceDeduplicationService {
    pub fn new(extractions: Arc<dyn ExtractionStore>, config: DedupConfig) -> Self {
        Self { extractions, config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Runs the exact and fuzzy stages for one extraction. Does not
    /// persist anything; see [`Self::update_duplicate_status`].
    pub async fn check_invoice_duplicate(
        &self,
        tenant: &TenantId,
        extraction_id: &ExtractionId,
        extracted_fields: &HashMap<String, ExtractedField>,
    ) -> Result<DuplicateResult, DedupError> {
        let invoice = InvoiceData::from_fields(extracted_fields, &self.config);
        let fingerprint = invoice_fingerprint(&invoice)?;

        // Exact stage.
        let exact = self
            .extractions
            .find_by_fingerprint(tenant, &fingerprint, Some(extraction_id))
            .await?;
        if let Some(original) = exact.into_iter().next() {
            info!(
                tenant = %tenant.0,
                extraction = %extraction_id,
                duplicate_of = %original.id,
                "exact fingerprint duplicate detected"
            );
            return Ok(DuplicateResult {
                match_type: MatchType::Exact,
                duplicate_extraction_id: Some(original.id),
                fingerprint: Some(fingerprint),
                confidence: 1.0,
                scores: None,
            });
        }

        // Fuzzy stage needs an anchor field to search on.
        if !invoice.has_anchor() {
            debug!(
                extraction = %extraction_id,
                "no vendor or invoice number, skipping fuzzy stage"
            );
            return Ok(DuplicateResult::unique(Some(fingerprint)));
        }

        // The vendor needle is normalized so punctuation noise on either
        // side cannot hide a candidate from the substring search.
        let query = CandidateQuery {
            vendor_name_like: invoice.vendor_name.as_deref().map(normalize_vendor),
            invoice_number: invoice.invoice_number.clone(),
            exclude: Some(extraction_id.clone()),
            limit: self.config.max_fuzzy_candidates,
        };
        let candidates = self.extractions.find_candidates(tenant, &query).await?;

        let best = self.best_candidate(&invoice, &candidates);
        let Some((candidate, scores)) = best else {
            return Ok(DuplicateResult::unique(Some(fingerprint)));
        };

        let match_type = self.classify(scores.overall);
        debug!(
            extraction = %extraction_id,
            candidate = %candidate.id,
            overall = scores.overall,
            ?match_type,
            "fuzzy stage best candidate"
        );

        if match_type == MatchType::Unique {
            // Best match below the lowest threshold is still not a
            // duplicate; keep the scores visible but name no candidate.
            return Ok(DuplicateResult {
                match_type: MatchType::Unique,
                duplicate_extraction_id: None,
                fingerprint: Some(fingerprint),
                confidence: 0.0,
                scores: Some(scores),
            });
        }

        info!(
            tenant = %tenant.0,
            extraction = %extraction_id,
            candidate = %candidate.id,
            confidence = scores.overall,
            ?match_type,
            "fuzzy duplicate detected"
        );
        Ok(DuplicateResult {
            match_type,
            duplicate_extraction_id: Some(candidate.id.clone()),
            fingerprint: Some(fingerprint),
            confidence: scores.overall,
            scores: Some(scores),
        })
    }

    /// Persists the engine-owned duplicate fields for an extraction.
    /// Plain overwrite, so replaying the same result is idempotent.
    pub async fn update_duplicate_status(
        &self,
        extraction_id: &ExtractionId,
        result: &DuplicateResult,
    ) -> Result<(), DedupError> {
        let status = result.match_type.into_status();
        let candidate_id = if result.match_type == MatchType::Unique {
            None
        } else {
            result.duplicate_extraction_id.clone()
        };
        let fields = DuplicateFields {
            fingerprint: result.fingerprint.clone(),
            confidence: result.confidence,
            candidate_id,
            status,
        };
        self.extractions.update_duplicate_fields(extraction_id, &fields).await
    }

    /// All extractions sharing the given extraction's fingerprint, in
    /// creation order. Empty when the extraction has no fingerprint yet.
    pub async fn get_duplicate_chain(
        &self,
        extraction_id: &ExtractionId,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let record = self
            .extractions
            .get(extraction_id)
            .await?
            .ok_or_else(|| DedupError::not_found(format!("extraction {extraction_id}")))?;

        match record.invoice_fingerprint {
            Some(fingerprint) => self.extractions.chain_by_fingerprint(&fingerprint).await,
            None => Ok(Vec::new()),
        }
    }

    /// Best candidate by overall score; ties go to the most recently
    /// created candidate.
    fn best_candidate<'a>(
        &self,
        invoice: &InvoiceData,
        candidates: &'a [ExtractionRecord],
    ) -> Option<(&'a ExtractionRecord, SimilarityScores)> {
        let mut best: Option<(&ExtractionRecord, SimilarityScores)> = None;
        for candidate in candidates {
            let candidate_invoice =
                InvoiceData::from_fields(&candidate.extracted_fields, &self.config);
            let scores = similarity_scores(invoice, &candidate_invoice, &self.config);
            let better = match &best {
                None => true,
                Some((current, current_scores)) => {
                    scores.overall > current_scores.overall
                        || (scores.overall == current_scores.overall
                            && candidate.created_at > current.created_at)
                }
            };
            if better {
                best = Some((candidate, scores));
            }
        }
        best
    }

    fn classify(&self, overall: f64) -> MatchType {
        let thresholds = &self.config.thresholds;
        if overall >= thresholds.certain {
            MatchType::Exact
        } else if overall >= thresholds.likely {
            MatchType::Likely
        } else if overall >= thresholds.possible {
            MatchType::Possible
        } else {
            MatchType::Unique
        }
    }
}
