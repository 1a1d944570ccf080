//! End-to-end engine runs against the SQLite stores.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use docdup_core::{
    DedupConfig, DeduplicationService, DocumentType, DuplicateStatus, ExtractedField,
    ExtractionId, ExtractionRecord, ExtractionStore, FileId, FileRecord,
    FullDeduplicationRequest, MatchType, TenantId,
};
use docdup_db::{
    connect_with_settings, migrations, ConnectionSettings, SqlExtractionStore, SqlFileStore,
};

fn tenant() -> TenantId {
    TenantId("t-1".to_string())
}

fn invoice_fields(vendor: &str, number: &str, date: &str, amount: &str) -> HashMap<String, ExtractedField> {
    [
        ("vendor_name", vendor),
        ("invoice_number", number),
        ("invoice_date", date),
        ("total_amount", amount),
        ("currency", "USD"),
    ]
    .iter()
    .map(|(key, value)| (key.to_string(), ExtractedField::new(*value, 0.9)))
    .collect()
}

fn file_record(id: &str, age_secs: i64) -> FileRecord {
    FileRecord {
        id: FileId(id.to_string()),
        tenant_id: tenant(),
        content_hash: None,
        file_size_bytes: None,
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

fn extraction_record(
    id: &str,
    fields: HashMap<String, ExtractedField>,
    age_secs: i64,
) -> ExtractionRecord {
    ExtractionRecord {
        id: ExtractionId(id.to_string()),
        file_id: FileId(format!("file-{id}")),
        tenant_id: tenant(),
        document_type: DocumentType::Invoice,
        extracted_fields: fields,
        invoice_fingerprint: None,
        duplicate_confidence: 0.0,
        duplicate_candidate_id: None,
        duplicate_status: DuplicateStatus::Unique,
        created_at: Utc::now() - Duration::seconds(age_secs),
    }
}

async fn engine_fixture() -> (DeduplicationService, Arc<SqlFileStore>, Arc<SqlExtractionStore>) {
    // A single connection so every query sees the same in-memory database.
    let settings = ConnectionSettings { max_connections: 1, ..ConnectionSettings::default() };
    let pool = connect_with_settings("sqlite::memory:", settings).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");

    let files = Arc::new(SqlFileStore::new(pool.clone()));
    let extractions = Arc::new(SqlExtractionStore::new(pool));
    let engine =
        DeduplicationService::new(files.clone(), extractions.clone(), DedupConfig::default())
            .expect("valid default config");
    (engine, files, extractions)
}

#[tokio::test]
async fn identical_uploads_are_blocked_at_the_file_stage() {
    let (engine, files, _) = engine_fixture().await;

    files.create(&file_record("f-1", 60)).await.expect("seed f-1");
    engine
        .file_service()
        .calculate_and_store_file_hash(&FileId("f-1".to_string()), b"same pdf bytes")
        .await
        .expect("hash f-1");

    files.create(&file_record("f-2", 0)).await.expect("seed f-2");
    let outcome = engine
        .perform_full_deduplication(FullDeduplicationRequest {
            tenant_id: tenant(),
            file_id: FileId("f-2".to_string()),
            file_bytes: b"same pdf bytes".to_vec(),
            extraction_id: None,
            extracted_fields: None,
        })
        .await;

    assert!(!outcome.should_process);
    assert_eq!(outcome.file_result.duplicate_file_id, Some(FileId("f-1".to_string())));
    assert_eq!(outcome.file_result.confidence, 1.0);
}

#[tokio::test]
async fn same_invoice_in_a_different_file_is_an_exact_fingerprint_duplicate() {
    let (engine, files, extractions) = engine_fixture().await;

    // First upload.
    files.create(&file_record("f-1", 120)).await.expect("seed f-1");
    let fields = invoice_fields("Acme Ltd", "INV-001", "2024-01-15", "100.00");
    extractions
        .create(&extraction_record("e-1", fields.clone(), 120))
        .await
        .expect("seed e-1");
    let first = engine
        .perform_full_deduplication(FullDeduplicationRequest {
            tenant_id: tenant(),
            file_id: FileId("f-1".to_string()),
            file_bytes: b"first rendering".to_vec(),
            extraction_id: Some(ExtractionId("e-1".to_string())),
            extracted_fields: Some(fields),
        })
        .await;
    assert!(first.should_process);

    // Re-scan of the same invoice: different bytes, same key fields with
    // formatting noise.
    files.create(&file_record("f-2", 0)).await.expect("seed f-2");
    let noisy = invoice_fields("  ACME, Ltd. ", "inv-001", "2024-01-15", "100");
    extractions
        .create(&extraction_record("e-2", noisy.clone(), 0))
        .await
        .expect("seed e-2");
    let second = engine
        .perform_full_deduplication(FullDeduplicationRequest {
            tenant_id: tenant(),
            file_id: FileId("f-2".to_string()),
            file_bytes: b"second rendering".to_vec(),
            extraction_id: Some(ExtractionId("e-2".to_string())),
            extracted_fields: Some(noisy),
        })
        .await;

    assert!(!second.should_process);
    let invoice_result = second.invoice_result.expect("stage 2 ran");
    assert_eq!(invoice_result.match_type, MatchType::Exact);
    assert_eq!(invoice_result.confidence, 1.0);
    assert_eq!(
        invoice_result.duplicate_extraction_id,
        Some(ExtractionId("e-1".to_string()))
    );

    let stored = extractions
        .get(&ExtractionId("e-2".to_string()))
        .await
        .expect("get e-2")
        .expect("e-2 exists");
    assert_eq!(stored.duplicate_status, DuplicateStatus::Duplicate);
}

#[tokio::test]
async fn vendor_variant_classifies_likely_and_blocks() {
    let (engine, files, extractions) = engine_fixture().await;

    files.create(&file_record("f-1", 120)).await.expect("seed f-1");
    let fields = invoice_fields("Acme Limited", "INV-001", "2024-01-15", "100.00");
    extractions
        .create(&extraction_record("e-1", fields.clone(), 120))
        .await
        .expect("seed e-1");
    engine
        .perform_full_deduplication(FullDeduplicationRequest {
            tenant_id: tenant(),
            file_id: FileId("f-1".to_string()),
            file_bytes: b"first rendering".to_vec(),
            extraction_id: Some(ExtractionId("e-1".to_string())),
            extracted_fields: Some(fields),
        })
        .await;

    files.create(&file_record("f-2", 0)).await.expect("seed f-2");
    let variant = invoice_fields("Acme Ltd", "INV-001", "2024-01-15", "100.00");
    extractions
        .create(&extraction_record("e-2", variant.clone(), 0))
        .await
        .expect("seed e-2");
    let outcome = engine
        .perform_full_deduplication(FullDeduplicationRequest {
            tenant_id: tenant(),
            file_id: FileId("f-2".to_string()),
            file_bytes: b"second rendering".to_vec(),
            extraction_id: Some(ExtractionId("e-2".to_string())),
            extracted_fields: Some(variant),
        })
        .await;

    assert!(!outcome.should_process, "likely duplicates block");
    let invoice_result = outcome.invoice_result.expect("stage 2 ran");
    assert_eq!(invoice_result.match_type, MatchType::Likely);
    assert!(
        (0.85..0.95).contains(&invoice_result.confidence),
        "confidence {}",
        invoice_result.confidence
    );
}

#[tokio::test]
async fn duplicate_chain_is_chronological_across_the_sql_store() {
    let (engine, files, extractions) = engine_fixture().await;

    for (index, (file_id, extraction_id, age)) in
        [("f-1", "e-1", 300), ("f-2", "e-2", 200), ("f-3", "e-3", 100)].iter().enumerate()
    {
        files.create(&file_record(file_id, *age)).await.expect("seed file");
        let fields = invoice_fields("Acme Ltd", "INV-001", "2024-01-15", "100.00");
        extractions
            .create(&extraction_record(extraction_id, fields.clone(), *age))
            .await
            .expect("seed extraction");
        engine
            .perform_full_deduplication(FullDeduplicationRequest {
                tenant_id: tenant(),
                file_id: FileId(file_id.to_string()),
                file_bytes: format!("rendering {index}").into_bytes(),
                extraction_id: Some(ExtractionId(extraction_id.to_string())),
                extracted_fields: Some(fields),
            })
            .await;
    }

    let chain = engine
        .invoice_service()
        .get_duplicate_chain(&ExtractionId("e-2".to_string()))
        .await
        .expect("chain");
    let ids: Vec<&str> = chain.iter().map(|record| record.id.0.as_str()).collect();
    assert_eq!(ids, ["e-1", "e-2", "e-3"]);
}

#[tokio::test]
async fn cross_tenant_content_never_matches() {
    let (engine, files, _) = engine_fixture().await;

    files.create(&file_record("f-1", 60)).await.expect("seed f-1");
    engine
        .file_service()
        .calculate_and_store_file_hash(&FileId("f-1".to_string()), b"shared bytes")
        .await
        .expect("hash f-1");

    let mut other_tenant_file = file_record("f-2", 0);
    other_tenant_file.tenant_id = TenantId("t-2".to_string());
    files.create(&other_tenant_file).await.expect("seed f-2");

    let outcome = engine
        .perform_full_deduplication(FullDeduplicationRequest {
            tenant_id: TenantId("t-2".to_string()),
            file_id: FileId("f-2".to_string()),
            file_bytes: b"shared bytes".to_vec(),
            extraction_id: None,
            extracted_fields: None,
        })
        .await;

    assert!(outcome.should_process, "matching is tenant-scoped");
    assert!(!outcome.file_result.is_duplicate);
}
