use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use docdup_core::domain::extraction::{
    DocumentType, DuplicateStatus, ExtractedField, ExtractionId, ExtractionRecord,
};
use docdup_core::domain::file::{FileId, TenantId};
use docdup_core::domain::invoice::field_value;
use docdup_core::errors::DedupError;
use docdup_core::hashing::{normalize_invoice_number, normalize_vendor};
use docdup_core::stores::{CandidateQuery, DuplicateFields, ExtractionStore};

use super::{database_error, parse_timestamp};
use crate::DbPool;

const SELECT_COLUMNS: &str = "id, file_id, tenant_id, document_type, extracted_fields, \
     invoice_fingerprint, duplicate_confidence, duplicate_candidate_id, duplicate_status, \
     created_at";

pub struct SqlExtractionStore {
    pool: DbPool,
}

impl SqlExtractionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts an extraction row. Creation belongs to the extraction
    /// subsystem; this exists for ingestion glue and tests. The search
    /// columns (normalized vendor, normalized invoice number) are derived
    /// from the field bag here so the candidate query can stay in SQL.
    pub async fn create(&self, record: &ExtractionRecord) -> Result<(), DedupError> {
        let fields_json = serde_json::to_string(&record.extracted_fields)
            .map_err(|error| DedupError::storage(format!("encode extracted_fields: {error}")))?;
        let vendor = field_value(&record.extracted_fields, &["vendor_name", "supplier_name", "vendor"])
            .map(normalize_vendor);
        let number =
            field_value(&record.extracted_fields, &["invoice_number", "document_number", "invoice_no"])
                .map(normalize_invoice_number);

        sqlx::query(
            r#"
            INSERT INTO extractions (
                id, file_id, tenant_id, document_type, extracted_fields,
                vendor_name, invoice_number, invoice_fingerprint,
                duplicate_confidence, duplicate_candidate_id, duplicate_status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id.0)
        .bind(&record.file_id.0)
        .bind(&record.tenant_id.0)
        .bind(record.document_type.as_str())
        .bind(fields_json)
        .bind(vendor)
        .bind(number)
        .bind(record.invoice_fingerprint.as_deref())
        .bind(record.duplicate_confidence)
        .bind(record.duplicate_candidate_id.as_ref().map(|id| &id.0))
        .bind(record.duplicate_status.as_str())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(())
    }
}

#[async_trait]
impl ExtractionStore for SqlExtractionStore {
    async fn get(&self, id: &ExtractionId) -> Result<Option<ExtractionRecord>, DedupError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM extractions WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(|r| extraction_from_row(&r)).transpose()
    }

    async fn find_by_fingerprint(
        &self,
        tenant: &TenantId,
        fingerprint: &str,
        exclude: Option<&ExtractionId>,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM extractions
            WHERE tenant_id = ?
              AND invoice_fingerprint = ?
              AND (? IS NULL OR id != ?)
            ORDER BY created_at ASC
            "#
        ))
        .bind(&tenant.0)
        .bind(fingerprint)
        .bind(exclude.map(|id| &id.0))
        .bind(exclude.map(|id| &id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(extraction_from_row).collect()
    }

    async fn find_candidates(
        &self,
        tenant: &TenantId,
        query: &CandidateQuery,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let vendor_needle = query.vendor_name_like.as_deref().map(normalize_vendor);
        let number_needle = query.invoice_number.as_deref().map(normalize_invoice_number);
        let exclude = query.exclude.as_ref().map(|id| &id.0);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM extractions
            WHERE tenant_id = ?
              AND document_type IN ('invoice', 'receipt', 'purchase_order')
              AND (? IS NULL OR id != ?)
              AND (
                    (? IS NOT NULL AND vendor_name LIKE '%' || ? || '%')
                 OR (? IS NOT NULL AND invoice_number = ?)
              )
            ORDER BY created_at DESC
            LIMIT ?
            "#
        ))
        .bind(&tenant.0)
        .bind(exclude)
        .bind(exclude)
        .bind(vendor_needle.as_deref())
        .bind(vendor_needle.as_deref())
        .bind(number_needle.as_deref())
        .bind(number_needle.as_deref())
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(extraction_from_row).collect()
    }

    async fn update_duplicate_fields(
        &self,
        id: &ExtractionId,
        fields: &DuplicateFields,
    ) -> Result<(), DedupError> {
        let result = sqlx::query(
            r#"
            UPDATE extractions
            SET invoice_fingerprint = ?,
                duplicate_confidence = ?,
                duplicate_candidate_id = ?,
                duplicate_status = ?
            WHERE id = ?
            "#,
        )
        .bind(fields.fingerprint.as_deref())
        .bind(fields.confidence)
        .bind(fields.candidate_id.as_ref().map(|id| &id.0))
        .bind(fields.status.as_str())
        .bind(&id.0)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(DedupError::not_found(format!("extraction {id}")));
        }
        Ok(())
    }

    async fn chain_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Vec<ExtractionRecord>, DedupError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM extractions
            WHERE invoice_fingerprint = ?
            ORDER BY created_at ASC
            "#
        ))
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(extraction_from_row).collect()
    }
}

fn extraction_from_row(row: &SqliteRow) -> Result<ExtractionRecord, DedupError> {
    let document_type: String = row.try_get("document_type").map_err(database_error)?;
    let fields_json: String = row.try_get("extracted_fields").map_err(database_error)?;
    let duplicate_status: String = row.try_get("duplicate_status").map_err(database_error)?;
    let created_at: String = row.try_get("created_at").map_err(database_error)?;
    let candidate_id: Option<String> =
        row.try_get("duplicate_candidate_id").map_err(database_error)?;

    let extracted_fields: HashMap<String, ExtractedField> = serde_json::from_str(&fields_json)
        .map_err(|error| DedupError::storage(format!("decode extracted_fields: {error}")))?;

    Ok(ExtractionRecord {
        id: ExtractionId(row.try_get("id").map_err(database_error)?),
        file_id: FileId(row.try_get("file_id").map_err(database_error)?),
        tenant_id: TenantId(row.try_get("tenant_id").map_err(database_error)?),
        document_type: DocumentType::parse(&document_type),
        extracted_fields,
        invoice_fingerprint: row.try_get("invoice_fingerprint").map_err(database_error)?,
        duplicate_confidence: row.try_get("duplicate_confidence").map_err(database_error)?,
        duplicate_candidate_id: candidate_id.map(ExtractionId),
        duplicate_status: DuplicateStatus::parse(&duplicate_status),
        created_at: parse_timestamp("created_at", created_at)?,
    })
}
