use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use docdup_core::domain::file::{FileId, FileRecord, TenantId};
use docdup_core::errors::DedupError;
use docdup_core::stores::FileStore;

use super::{database_error, parse_timestamp};
use crate::DbPool;

pub struct SqlFileStore {
    pool: DbPool,
}

impl SqlFileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts a file row. File creation belongs to the ingestion side of
    /// the pipeline; the engine itself only updates hash and size.
    pub async fn create(&self, record: &FileRecord) -> Result<(), DedupError> {
        sqlx::query(
            r#"
            INSERT INTO files (id, tenant_id, content_hash, file_size_bytes, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id.0)
        .bind(&record.tenant_id.0)
        .bind(record.content_hash.as_deref())
        .bind(record.file_size_bytes)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(())
    }

    pub async fn get(&self, id: &FileId) -> Result<Option<FileRecord>, DedupError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, content_hash, file_size_bytes, created_at FROM files WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        row.map(|r| file_from_row(&r)).transpose()
    }
}

#[async_trait]
impl FileStore for SqlFileStore {
    async fn find_by_content(
        &self,
        tenant: &TenantId,
        content_hash: &str,
        file_size_bytes: i64,
        exclude: Option<&FileId>,
    ) -> Result<Vec<FileRecord>, DedupError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, content_hash, file_size_bytes, created_at
            FROM files
            WHERE tenant_id = ?
              AND content_hash = ?
              AND file_size_bytes = ?
              AND (? IS NULL OR id != ?)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&tenant.0)
        .bind(content_hash)
        .bind(file_size_bytes)
        .bind(exclude.map(|id| &id.0))
        .bind(exclude.map(|id| &id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.iter().map(file_from_row).collect()
    }

    async fn update_hash_and_size(
        &self,
        file_id: &FileId,
        content_hash: &str,
        file_size_bytes: i64,
    ) -> Result<(), DedupError> {
        let result = sqlx::query(
            "UPDATE files SET content_hash = ?, file_size_bytes = ? WHERE id = ?",
        )
        .bind(content_hash)
        .bind(file_size_bytes)
        .bind(&file_id.0)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            return Err(DedupError::not_found(format!("file {}", file_id.0)));
        }
        Ok(())
    }
}

fn file_from_row(row: &SqliteRow) -> Result<FileRecord, DedupError> {
    let created_at: String = row.try_get("created_at").map_err(database_error)?;
    Ok(FileRecord {
        id: FileId(row.try_get("id").map_err(database_error)?),
        tenant_id: TenantId(row.try_get("tenant_id").map_err(database_error)?),
        content_hash: row.try_get("content_hash").map_err(database_error)?,
        file_size_bytes: row.try_get("file_size_bytes").map_err(database_error)?,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}
