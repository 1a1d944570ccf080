pub mod extraction;
pub mod file;
pub mod invoice;

pub use extraction::{
    DocumentType, DuplicateStatus, ExtractedField, ExtractionId, ExtractionRecord, MatchType,
};
pub use file::{FileId, FileRecord, TenantId};
pub use invoice::{field_value, InvoiceData, SimilarityScores};
