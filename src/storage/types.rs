use crate::generation::ContentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed generation, as shown in the history list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Unique identifier for the generation
    pub id: String,
    /// Prompt the user submitted
    pub prompt: String,
    /// Kind of document produced
    pub content_type: ContentType,
    /// Public download URL of the stored file
    pub file_path: String,
    /// Lifecycle status (always `completed` for stored rows)
    pub status: String,
    /// When the generation finished
    pub created_at: DateTime<Utc>,
}

/// Account row of the credit ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Identity service user id
    pub id: String,
    /// Email recorded when the account was first seen
    pub email: Option<String>,
    /// Current balance
    pub credit_balance: u32,
    /// When the account was first seen
    pub created_at: DateTime<Utc>,
}
