use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

/// Represents a registered user in the ledger
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub tokens_used: i64,
    pub registered_at: DateTime<Utc>,
}

/// Per-user usage ledger backed by a single SQLite connection
#[derive(Debug, Clone)]
pub struct UserLedger {
    pool: SqlitePool,
}

impl UserLedger {
    /// Open (creating if needed) the store at `database_url` and initialize
    /// the schema
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!(database_url = %database_url, "Opening user ledger");

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        // One connection keeps `sqlite::memory:` databases alive and shared
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open database")?;

        let ledger = Self { pool };
        ledger.init_database_schema().await?;
        Ok(ledger)
    }

    /// Initialize the database schema
    async fn init_database_schema(&self) -> Result<()> {
        info!("Initializing database schema...");

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                tokens_used INTEGER NOT NULL DEFAULT 0,
                registered_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create users table")?;

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Register a user. Existing users are left untouched.
    ///
    /// Returns `true` when a new row was created.
    pub async fn register(&self, user_id: i64, username: Option<&str>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (user_id, username, tokens_used, registered_at)
             VALUES (?, ?, 0, ?)",
        )
        .bind(user_id)
        .bind(username)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .context("Failed to register user")?;

        let created = result.rows_affected() > 0;
        if created {
            info!(user_id, "Registered new user");
        } else {
            debug!(user_id, "User already registered");
        }
        Ok(created)
    }

    /// Add `amount` usage units to a user's counter.
    ///
    /// Returns `false` without error when the user is not registered.
    pub async fn add_usage(&self, user_id: i64, amount: u32) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET tokens_used = tokens_used + ? WHERE user_id = ?")
            .bind(i64::from(amount))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to update usage")?;

        let updated = result.rows_affected() > 0;
        if updated {
            debug!(user_id, amount, "Usage recorded");
        } else {
            debug!(user_id, amount, "Usage not recorded for unregistered user");
        }
        Ok(updated)
    }

    /// Read a user's record
    pub async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, username, tokens_used, registered_at FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read user")
    }

    /// Close the underlying connection
    pub async fn close(&self) {
        info!("Closing user ledger");
        self.pool.close().await;
    }
}
