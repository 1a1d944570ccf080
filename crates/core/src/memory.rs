//! In-memory store implementations.
//!
//! These back the engine's unit tests and double as the reference
//! semantics for the SQL stores in `docdup-db`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::extraction::{ExtractionId, ExtractionRecord};
use crate::domain::file::{FileId, FileRecord, TenantId};
use crate::errors::DedupError;
use crate::hashing::{normalize_invoice_number, normalize_vendor};
use crate::stores::{CandidateQuery, DuplicateFields, ExtractionStore, FileStore};

#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, FileRecord>>,
}

impl MemoryFileStore {
    pub async fn insert(&self, record: FileRecord) {
        let mut files = self.files.write().await;
        files.insert(record.id.0.clone(), record);
    }

    pub async fn get(&self, id: &FileId) -> Option<FileRecord> {
        let files = self.files.read().await;
        files.get(&id.0).cloned()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn find_by_content(
        &self,
        tenant: &TenantId,
        content_hash: &str,
        file_size_bytes: i64,
        exclude: Option<&FileId>,
    ) -> Result<Vec<FileRecord>, DedupError> {
        let files = self.files.read().await;
        let mut matches: Vec<FileRecord> = files
            .values()
            .filter(|record| {
                record.tenant_id == *tenant
                    && record.content_hash.as_deref() == Some(content_hash)
                    && record.file_size_bytes == Some(file_size_bytes)
                    && exclude.map_or(true, |id| record.id != *id)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }

    async fn update_hash_and_size(
        &self,
        file_id: &FileId,
        content_hash: &str,
        file_size_bytes: i64,
    ) -> Result<(), DedupError> {
        let mut files = self.files.write().await;
        let record = files
            .get_mut(&file_id.0)
            .ok_or_else(|| DedupError::not_found(format!("file {}", file_id.0)))?;
        record.content_hash = Some(content_hash.to_string());
        record.file_size_bytes = Some(file_size_bytes);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryExtractionStore {
    extractions: RwLock<HashMap<String, ExtractionRecord>>,
}

impl MemoryExtractionStore {
    pub async fn insert(&self, record: ExtractionRecord) {
        let mut extractions = self.extractions.write().await;
        extractions.insert(record.id.0.clone(), record);
    }
}

#[async_trait]
impl ExtractionStore for MemoryExtractionStore {
    async fn get(&self, id: &ExtractionId) -> Result<Option<ExtractionRecord>, DedupError> {
        let extractions = self.extractions.read().await;
        Ok(extractions.get(&id.0).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        tenant: &TenantId,
        fingerprint: &str,
        exclude: Option<&ExtractionId>,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let extractions = self.extractions.read().await;
        let mut matches: Vec<ExtractionRecord> = extractions
            .values()
            .filter(|record| {
                record.tenant_id == *tenant
                    && record.invoice_fingerprint.as_deref() == Some(fingerprint)
                    && exclude.map_or(true, |id| record.id != *id)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matches)
    }

    async fn find_candidates(
        &self,
        tenant: &TenantId,
        query: &CandidateQuery,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let vendor_needle = query.vendor_name_like.as_deref().map(normalize_vendor);
        let number_needle = query.invoice_number.as_deref().map(normalize_invoice_number);

        let extractions = self.extractions.read().await;
        let mut matches: Vec<ExtractionRecord> = extractions
            .values()
            .filter(|record| {
                record.tenant_id == *tenant
                    && record.document_type.is_fuzzy_candidate()
                    && query.exclude.as_ref().map_or(true, |id| record.id != *id)
                    && candidate_matches(record, &vendor_needle, &number_needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(query.limit);
        Ok(matches)
    }

    async fn update_duplicate_fields(
        &self,
        id: &ExtractionId,
        fields: &DuplicateFields,
    ) -> Result<(), DedupError> {
        let mut extractions = self.extractions.write().await;
        let record = extractions
            .get_mut(&id.0)
            .ok_or_else(|| DedupError::not_found(format!("extraction {id}")))?;
        record.invoice_fingerprint = fields.fingerprint.clone();
        record.duplicate_confidence = fields.confidence;
        record.duplicate_candidate_id = fields.candidate_id.clone();
        record.duplicate_status = fields.status;
        Ok(())
    }

    async fn chain_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let extractions = self.extractions.read().await;
        let mut chain: Vec<ExtractionRecord> = extractions
            .values()
            .filter(|record| record.invoice_fingerprint.as_deref() == Some(fingerprint))
            .cloned()
            .collect();
        chain.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(chain)
    }
}

fn candidate_matches(
    record: &ExtractionRecord,
    vendor_needle: &Option<String>,
    number_needle: &Option<String>,
) -> bool {
    use crate::domain::invoice::field_value;

    if let Some(needle) = vendor_needle {
        let vendor = field_value(&record.extracted_fields, &["vendor_name", "supplier_name", "vendor"]);
        if let Some(vendor) = vendor {
            // Both sides normalized, matching the derived search column in
            // the SQL store.
            if normalize_vendor(vendor).contains(needle.as_str()) {
                return true;
            }
        }
    }
    if let Some(needle) = number_needle {
        let number =
            field_value(&record.extracted_fields, &["invoice_number", "document_number", "invoice_no"]);
        if let Some(number) = number {
            if normalize_invoice_number(number) == *needle {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::extraction::{
        DocumentType, DuplicateStatus, ExtractedField, ExtractionId, ExtractionRecord,
    };
    use crate::domain::file::{FileId, FileRecord, TenantId};
    use crate::stores::{CandidateQuery, ExtractionStore, FileStore};

    use super::{MemoryExtractionStore, MemoryFileStore};

    fn file(id: &str, tenant: &str, hash: Option<&str>, size: Option<i64>) -> FileRecord {
        FileRecord {
            id: FileId(id.to_string()),
            tenant_id: TenantId(tenant.to_string()),
            content_hash: hash.map(str::to_string),
            file_size_bytes: size,
            created_at: Utc::now(),
        }
    }

    fn extraction(id: &str, tenant: &str, vendor: &str, number: &str) -> ExtractionRecord {
        let mut fields = std::collections::HashMap::new();
        fields.insert("vendor_name".to_string(), ExtractedField::new(vendor, 0.9));
        fields.insert("invoice_number".to_string(), ExtractedField::new(number, 0.9));
        ExtractionRecord {
            id: ExtractionId(id.to_string()),
            file_id: FileId(format!("file-{id}")),
            tenant_id: TenantId(tenant.to_string()),
            document_type: DocumentType::Invoice,
            extracted_fields: fields,
            invoice_fingerprint: None,
            duplicate_confidence: 0.0,
            duplicate_candidate_id: None,
            duplicate_status: DuplicateStatus::Unique,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn content_lookup_is_tenant_scoped() {
        let store = MemoryFileStore::default();
        store.insert(file("f-1", "t-1", Some("abc"), Some(10))).await;
        store.insert(file("f-2", "t-2", Some("abc"), Some(10))).await;

        let tenant = TenantId("t-1".to_string());
        let matches = store.find_by_content(&tenant, "abc", 10, None).await.expect("lookup");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id.0, "f-1");
    }

    #[tokio::test]
    async fn content_lookup_can_exclude_the_checking_file() {
        let store = MemoryFileStore::default();
        store.insert(file("f-1", "t-1", Some("abc"), Some(10))).await;

        let tenant = TenantId("t-1".to_string());
        let exclude = FileId("f-1".to_string());
        let matches =
            store.find_by_content(&tenant, "abc", 10, Some(&exclude)).await.expect("lookup");
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn candidates_match_on_vendor_substring_or_exact_number() {
        let store = MemoryExtractionStore::default();
        store.insert(extraction("e-1", "t-1", "Acme Industrial Ltd", "INV-001")).await;
        store.insert(extraction("e-2", "t-1", "Globex Corp", "INV-777")).await;
        store.insert(extraction("e-3", "t-1", "Initech", "INV-001")).await;

        let tenant = TenantId("t-1".to_string());
        let query = CandidateQuery {
            vendor_name_like: Some("acme".to_string()),
            invoice_number: Some("inv-001".to_string()),
            exclude: None,
            limit: 10,
        };
        let candidates = store.find_candidates(&tenant, &query).await.expect("candidates");
        let ids: Vec<&str> = candidates.iter().map(|c| c.id.0.as_str()).collect();
        assert!(ids.contains(&"e-1"), "vendor substring match missing: {ids:?}");
        assert!(ids.contains(&"e-3"), "exact number match missing: {ids:?}");
        assert!(!ids.contains(&"e-2"));
    }

    #[tokio::test]
    async fn vendor_candidates_survive_punctuation_noise() {
        let store = MemoryExtractionStore::default();
        store.insert(extraction("e-1", "t-1", "ACME, Ltd.", "INV-100")).await;

        // Different invoice number, so vendor is the only recall path.
        let tenant = TenantId("t-1".to_string());
        let query = CandidateQuery {
            vendor_name_like: Some("acme ltd".to_string()),
            invoice_number: Some("inv-200".to_string()),
            exclude: None,
            limit: 10,
        };
        let candidates = store.find_candidates(&tenant, &query).await.expect("candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id.0, "e-1");
    }

    #[tokio::test]
    async fn candidate_limit_is_enforced_newest_first() {
        let store = MemoryExtractionStore::default();
        for i in 0..5 {
            let mut record = extraction(&format!("e-{i}"), "t-1", "Acme Ltd", "INV-001");
            record.created_at = Utc::now() + Duration::seconds(i);
            store.insert(record).await;
        }

        let tenant = TenantId("t-1".to_string());
        let query = CandidateQuery {
            vendor_name_like: Some("acme".to_string()),
            invoice_number: None,
            exclude: None,
            limit: 2,
        };
        let candidates = store.find_candidates(&tenant, &query).await.expect("candidates");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id.0, "e-4");
        assert_eq!(candidates[1].id.0, "e-3");
    }
}
