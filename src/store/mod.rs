pub mod json;
pub mod sqlite;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::SeenRecord;

pub use json::JsonFileStore;
pub use sqlite::SqliteRecordStore;

/// Whole-value persistence for the seen-item ledger.
///
/// There is no append: `write_all` replaces everything previously stored.
#[async_trait]
pub trait RecordStore {
    async fn read_all(&self) -> Result<Vec<SeenRecord>>;
    async fn write_all(&self, records: &[SeenRecord]) -> Result<()>;
}
