use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted proof that an identifier has been observed and notified.
///
/// Serialized as `{"id": ..., "firstSeen": ...}` with an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenRecord {
    pub id: String,
    pub first_seen: DateTime<Utc>,
}

impl SeenRecord {
    pub fn new(id: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            first_seen,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        now.signed_duration_since(self.first_seen) > retention
    }
}
