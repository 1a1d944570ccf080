use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant scope for every lookup; the engine never matches across tenants.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

/// Stored file metadata, owned by the external file store.
///
/// The engine only reads the identity triple and writes `content_hash` /
/// `file_size_bytes`. Both stay `None` until
/// `calculate_and_store_file_hash` has run for the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub tenant_id: TenantId,
    pub content_hash: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// Two records with an equal `(tenant, hash, size)` triple carry the
    /// same content.
    pub fn same_content(&self, other: &FileRecord) -> bool {
        self.tenant_id == other.tenant_id
            && self.content_hash.is_some()
            && self.content_hash == other.content_hash
            && self.file_size_bytes == other.file_size_bytes
    }
}
