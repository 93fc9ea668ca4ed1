use crate::config::DatabaseConfig;
use crate::credits::CreditBalance;
use crate::error::{ForgeError, Result};
use crate::generation::ContentType;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;
pub use types::{AccountRecord, HistoryItem};

/// Status recorded for generations that produced a stored file
pub const STATUS_COMPLETED: &str = "completed";

/// Credit ledger and generation history backed by SQLite
///
/// Every operation opens its own connection, so a `SqliteStorage` is cheap to
/// clone and share between request handlers.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "elvanforge", "lesson-forge")
            .ok_or_else(|| ForgeError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("ledger.db"))
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("ledger.db")).unwrap();
    /// assert!(storage.db_path().ends_with("ledger.db"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create parent directory for database")
                    .map_err(|e| ForgeError::Storage(e.to_string()))?;
            }
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Open the storage named by the configuration, or the default location
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::new_with_path(path.clone()),
            None => Self::new(),
        }
    }

    /// Path of the underlying database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| ForgeError::Storage(e.to_string()))?;
        Ok(conn)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT,
                credit_balance INTEGER NOT NULL DEFAULT 0 CHECK (credit_balance >= 0),
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS generations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                prompt TEXT NOT NULL,
                content_type TEXT NOT NULL,
                file_path TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_generations_user
                ON generations(user_id, created_at);",
        )
        .context("Failed to create tables")
        .map_err(|e| ForgeError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Create the account row if it does not exist yet
    ///
    /// New accounts start with `starting_balance` credits; existing accounts
    /// are left untouched.
    pub fn ensure_account(&self, id: &str, email: Option<&str>, starting_balance: u32) -> Result<()> {
        let conn = self.open()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO users (id, email, credit_balance, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, email, starting_balance, now_timestamp()],
            )
            .context("Failed to create account")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        if inserted > 0 {
            tracing::info!(user_id = id, starting_balance, "Created ledger account");
        }
        Ok(())
    }

    /// Load an account row
    pub fn account(&self, id: &str) -> Result<Option<AccountRecord>> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, email, credit_balance, created_at FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to load account")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        row.map(|(id, email, balance, created_at)| {
            Ok(AccountRecord {
                id,
                email,
                credit_balance: CreditBalance::from_signed(balance).credits(),
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    /// Current balance; unknown accounts read as zero
    pub fn balance(&self, id: &str) -> Result<CreditBalance> {
        let conn = self.open()?;
        let balance: Option<i64> = conn
            .query_row(
                "SELECT credit_balance FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to read balance")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        Ok(CreditBalance::from_signed(balance.unwrap_or(0)))
    }

    /// Atomically deduct `cost` credits if the balance covers it
    ///
    /// # Returns
    ///
    /// The balance after the deduction
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::InsufficientCredits` when the balance is lower
    /// than `cost`; the balance is left unchanged.
    pub fn reserve(&self, id: &str, cost: u32) -> Result<CreditBalance> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        let updated = tx
            .execute(
                "UPDATE users SET credit_balance = credit_balance - ?1
                 WHERE id = ?2 AND credit_balance >= ?1",
                params![cost, id],
            )
            .context("Failed to deduct credits")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        let balance: Option<i64> = tx
            .query_row(
                "SELECT credit_balance FROM users WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        tx.commit()
            .context("Failed to commit deduction")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        let balance = CreditBalance::from_signed(balance.unwrap_or(0));
        if updated == 0 {
            return Err(ForgeError::InsufficientCredits {
                required: cost,
                available: balance.credits(),
            }
            .into());
        }

        tracing::debug!(user_id = id, cost, remaining = balance.credits(), "Reserved credits");
        Ok(balance)
    }

    /// Return previously reserved credits
    pub fn refund(&self, id: &str, amount: u32) -> Result<CreditBalance> {
        self.add_credits(id, amount)?;
        tracing::info!(user_id = id, amount, "Refunded credits");
        self.balance(id)
    }

    /// Add credits to an account, creating it when needed
    pub fn grant(&self, id: &str, amount: u32, email: Option<&str>) -> Result<CreditBalance> {
        self.ensure_account(id, email, 0)?;
        self.add_credits(id, amount)?;
        tracing::info!(user_id = id, amount, "Granted credits");
        self.balance(id)
    }

    fn add_credits(&self, id: &str, amount: u32) -> Result<()> {
        let conn = self.open()?;
        let updated = conn
            .execute(
                "UPDATE users SET credit_balance = credit_balance + ?1 WHERE id = ?2",
                params![amount, id],
            )
            .context("Failed to add credits")
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        if updated == 0 {
            return Err(ForgeError::Storage(format!("Unknown account: {}", id)).into());
        }
        Ok(())
    }

    /// Append a completed generation to the user's history
    pub fn record_generation(
        &self,
        user_id: &str,
        prompt: &str,
        content_type: ContentType,
        file_path: &str,
    ) -> Result<HistoryItem> {
        let conn = self.open()?;
        let created_at = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO generations (id, user_id, prompt, content_type, file_path, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                user_id,
                prompt,
                content_type.as_str(),
                file_path,
                STATUS_COMPLETED,
                format_timestamp(&created_at)
            ],
        )
        .context("Failed to insert generation")
        .map_err(|e| ForgeError::Storage(e.to_string()))?;

        Ok(HistoryItem {
            id,
            prompt: prompt.to_string(),
            content_type,
            file_path: file_path.to_string(),
            status: STATUS_COMPLETED.to_string(),
            created_at,
        })
    }

    /// List a user's generations, newest first
    pub fn list_history(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<HistoryItem>> {
        let conn = self.open()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = conn
            .prepare(
                "SELECT id, prompt, content_type, file_path, status, created_at
                 FROM generations
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| ForgeError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in rows {
            let (id, prompt, content_type, file_path, status, created_at) =
                row.map_err(|e| ForgeError::Storage(e.to_string()))?;
            items.push(HistoryItem {
                id,
                prompt,
                content_type: content_type
                    .parse()
                    .map_err(|e: ForgeError| ForgeError::Storage(e.to_string()))?,
                file_path,
                status,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        Ok(items)
    }
}

fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

// Fixed-width so that lexical order matches chronological order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| ForgeError::Storage(format!("Invalid timestamp {}: {}", value, e)))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_storage() -> (SqliteStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = SqliteStorage::new_with_path(dir.path().join("ledger.db")).unwrap();
        (storage, dir)
    }

    #[test]
    fn test_unknown_account_has_zero_balance() {
        let (storage, _dir) = temp_storage();
        assert_eq!(storage.balance("nobody").unwrap().credits(), 0);
        assert!(storage.account("nobody").unwrap().is_none());
    }

    #[test]
    fn test_ensure_account_is_idempotent() {
        let (storage, _dir) = temp_storage();
        storage
            .ensure_account("u1", Some("teacher@example.com"), 3)
            .unwrap();
        storage.ensure_account("u1", None, 10).unwrap();

        let account = storage.account("u1").unwrap().unwrap();
        assert_eq!(account.credit_balance, 3);
        assert_eq!(account.email.as_deref(), Some("teacher@example.com"));
    }

    #[test]
    fn test_reserve_deducts_when_covered() {
        let (storage, _dir) = temp_storage();
        storage.ensure_account("u1", None, 5).unwrap();
        let remaining = storage.reserve("u1", 2).unwrap();
        assert_eq!(remaining.credits(), 3);
    }

    #[test]
    fn test_reserve_never_goes_negative() {
        let (storage, _dir) = temp_storage();
        storage.ensure_account("u1", None, 1).unwrap();

        let err = storage.reserve("u1", 2).unwrap_err();
        match err.downcast_ref::<ForgeError>() {
            Some(ForgeError::InsufficientCredits {
                required,
                available,
            }) => {
                assert_eq!(*required, 2);
                assert_eq!(*available, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(storage.balance("u1").unwrap().credits(), 1);
    }

    #[test]
    fn test_reserve_unknown_account_is_insufficient() {
        let (storage, _dir) = temp_storage();
        assert!(storage.reserve("ghost", 1).is_err());
    }

    #[test]
    fn test_refund_restores_balance() {
        let (storage, _dir) = temp_storage();
        storage.ensure_account("u1", None, 4).unwrap();
        storage.reserve("u1", 3).unwrap();
        let restored = storage.refund("u1", 3).unwrap();
        assert_eq!(restored.credits(), 4);
    }

    #[test]
    fn test_grant_creates_account() {
        let (storage, _dir) = temp_storage();
        let balance = storage.grant("u2", 50, Some("a@b.c")).unwrap();
        assert_eq!(balance.credits(), 50);
        let balance = storage.grant("u2", 10, None).unwrap();
        assert_eq!(balance.credits(), 60);
    }

    #[test]
    fn test_history_is_newest_first() {
        let (storage, _dir) = temp_storage();
        storage.ensure_account("u1", None, 0).unwrap();
        storage
            .record_generation("u1", "first", ContentType::Lesson, "https://f/1.pdf")
            .unwrap();
        storage
            .record_generation("u1", "second", ContentType::Presentation, "https://f/2.pptx")
            .unwrap();
        storage
            .record_generation("u1", "third", ContentType::Lesson, "https://f/3.pdf")
            .unwrap();

        let items = storage.list_history("u1", None).unwrap();
        let prompts: Vec<&str> = items.iter().map(|i| i.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["third", "second", "first"]);
        assert_eq!(items[1].content_type, ContentType::Presentation);
        assert_eq!(items[0].status, STATUS_COMPLETED);
    }

    #[test]
    fn test_history_limit_and_isolation() {
        let (storage, _dir) = temp_storage();
        storage.ensure_account("u1", None, 0).unwrap();
        storage.ensure_account("u2", None, 0).unwrap();
        for i in 0..5 {
            storage
                .record_generation("u1", &format!("p{}", i), ContentType::Lesson, "x")
                .unwrap();
        }
        storage
            .record_generation("u2", "other", ContentType::Lesson, "y")
            .unwrap();

        assert_eq!(storage.list_history("u1", Some(2)).unwrap().len(), 2);
        assert_eq!(storage.list_history("u1", None).unwrap().len(), 5);
        assert_eq!(storage.list_history("u2", None).unwrap().len(), 1);
        assert!(storage.list_history("u3", None).unwrap().is_empty());
    }

    #[test]
    fn test_timestamp_round_trip_is_fixed_width() {
        let ts = Utc::now();
        let formatted = format_timestamp(&ts);
        assert_eq!(formatted.len(), "2024-01-01T00:00:00.000000Z".len());
        let parsed = parse_timestamp(&formatted).unwrap();
        assert_eq!(format_timestamp(&parsed), formatted);
    }
}
