use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Server-side record behind a session cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionModel {
    #[serde(rename = "_id")]
    pub id: String, // UUID v4 as string
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SessionModel {
    /// Creates a new empty session with generated ID and timestamps
    pub fn new(expiration_days: i64) -> Self {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(expiration_days);

        Self {
            id: Uuid::new_v4().to_string(),
            values: BTreeMap::new(),
            created_at: now,
            expires_at,
        }
    }

    /// Checks if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Moves the expiry to `days` from now
    pub fn extend_expiration(&mut self, days: i64) {
        self.expires_at = Utc::now() + chrono::Duration::days(days);
    }
}
