use chrono::{DateTime, Utc};

use docdup_core::errors::DedupError;

pub mod extraction;
pub mod file;

pub use extraction::SqlExtractionStore;
pub use file::SqlFileStore;

pub(crate) fn database_error(error: sqlx::Error) -> DedupError {
    DedupError::storage(error.to_string())
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, DedupError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|error| DedupError::storage(format!("invalid {column} timestamp: {error}")))
}
