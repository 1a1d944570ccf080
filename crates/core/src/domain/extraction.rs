use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::file::{FileId, TenantId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractionId(pub String);

impl fmt::Display for ExtractionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document classes produced by the extraction subsystem. Only the first
/// three participate in fuzzy candidate search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Receipt,
    PurchaseOrder,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::PurchaseOrder => "purchase_order",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "invoice" => Self::Invoice,
            "receipt" => Self::Receipt,
            "purchase_order" => Self::PurchaseOrder,
            _ => Self::Other,
        }
    }

    pub fn is_fuzzy_candidate(&self) -> bool {
        matches!(self, Self::Invoice | Self::Receipt | Self::PurchaseOrder)
    }
}

/// Persisted duplicate classification of an extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStatus {
    #[default]
    Unique,
    PossibleDuplicate,
    Duplicate,
}

impl DuplicateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::PossibleDuplicate => "possible_duplicate",
            Self::Duplicate => "duplicate",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "possible_duplicate" => Self::PossibleDuplicate,
            "duplicate" => Self::Duplicate,
            _ => Self::Unique,
        }
    }
}

/// Outcome class of a single duplicate check, before persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Unique,
    Possible,
    Likely,
    Exact,
}

impl MatchType {
    /// Monotone rank: raising the score never lowers the rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Unique => 0,
            Self::Possible => 1,
            Self::Likely => 2,
            Self::Exact => 3,
        }
    }

    pub fn into_status(self) -> DuplicateStatus {
        match self {
            Self::Exact => DuplicateStatus::Duplicate,
            Self::Likely | Self::Possible => DuplicateStatus::PossibleDuplicate,
            Self::Unique => DuplicateStatus::Unique,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        !matches!(self, Self::Unique)
    }
}

/// One extracted field value with the extractor's confidence in it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: String,
    pub confidence: f64,
}

impl ExtractedField {
    pub fn new(value: impl Into<String>, confidence: f64) -> Self {
        Self { value: value.into(), confidence }
    }
}

/// Extraction row as seen by the engine. Created by the extraction
/// subsystem; the engine mutates only the duplicate fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub id: ExtractionId,
    pub file_id: FileId,
    pub tenant_id: TenantId,
    pub document_type: DocumentType,
    pub extracted_fields: HashMap<String, ExtractedField>,
    pub invoice_fingerprint: Option<String>,
    pub duplicate_confidence: f64,
    pub duplicate_candidate_id: Option<ExtractionId>,
    pub duplicate_status: DuplicateStatus,
    pub created_at: DateTime<Utc>,
}
