//! This module is responsible for reading, writing and managing the SQLite database.

mod migrations;

use crate::model::{Expense, Quincena, Source};
use crate::Result;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// The columns of one `expenses` row, in table order.
type ExpenseRow = (
    String, // id
    String, // user_wa_id
    String, // label
    f64,    // amount
    String, // currency
    String, // raw
    String, // source
    String, // timestamp
    i64,    // year
    i64,    // month
    i64,    // day
    i64,    // quincena
);

const SELECT_EXPENSE: &str = "SELECT id, user_wa_id, label, amount, currency, raw, source, \
                              timestamp, year, month, day, quincena FROM expenses";

/// A handle to the SQLite datastore holding the recorded expenses.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn init(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A SQLite file already exists at {}", path.display());
        }
        let pool = connect(path, true).await?;
        bootstrap_schema_version(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Creates a SQLite client
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    pub(crate) async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!(
                "No SQLite file found at {}, run 'gastos init' first",
                path.display()
            );
        }
        let pool = connect(path, false).await?;
        bootstrap_schema_version(&pool).await?;
        let current = schema_version(&pool).await?;
        migrations::run(&pool, current, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// Inserts one expense row.
    pub(crate) async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        sqlx::query(
            "INSERT INTO expenses (id, user_wa_id, label, amount, currency, raw, source, \
             timestamp, year, month, day, quincena) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(expense.id())
        .bind(expense.user_wa_id())
        .bind(expense.label())
        .bind(expense.amount())
        .bind(expense.currency())
        .bind(expense.raw())
        .bind(expense.source().as_str())
        .bind(expense.timestamp().to_rfc3339())
        .bind(expense.year())
        .bind(i64::from(expense.month()))
        .bind(i64::from(expense.day()))
        .bind(i64::from(expense.quincena().number()))
        .execute(&self.pool)
        .await
        .context("Failed to insert expense")?;
        Ok(())
    }

    /// Returns the most recently recorded expenses, newest first, optionally
    /// restricted to one sender.
    pub(crate) async fn recent_expenses(
        &self,
        user_wa_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = match user_wa_id {
            Some(user) => {
                sqlx::query_as(&format!(
                    "{SELECT_EXPENSE} WHERE user_wa_id = ? ORDER BY timestamp DESC LIMIT ?"
                ))
                .bind(user)
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    "{SELECT_EXPENSE} ORDER BY timestamp DESC LIMIT ?"
                ))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to query expenses")?;

        rows.into_iter().map(from_row).collect()
    }

    /// Returns the number of rows in the expenses table.
    pub(crate) async fn count_expenses(&self) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM expenses")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;
        Ok(row.0 as u64)
    }
}

/// Opens a connection pool to the SQLite file at `path`.
async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse SQLite connection string")?
        .create_if_missing(create);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open the SQLite database at {}", path.display()))
}

/// Creates the `schema_version` table when it is missing and seeds it with version 0.
async fn bootstrap_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;

    sqlx::query(
        "INSERT INTO schema_version (version) \
         SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version)",
    )
    .execute(pool)
    .await
    .context("Failed to seed schema_version table")?;
    Ok(())
}

/// Reads the current schema version.
async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;
    Ok(row.0)
}

/// Converts stored columns back into an [`Expense`].
fn from_row(row: ExpenseRow) -> Result<Expense> {
    let (id, user_wa_id, label, amount, currency, raw, source, timestamp, year, month, day, quincena) =
        row;
    let source = Source::from_str(&source)?;
    let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp)
        .with_context(|| format!("Invalid stored timestamp '{timestamp}'"))?
        .with_timezone(&Utc);
    Ok(Expense::from_stored(
        id,
        user_wa_id,
        label,
        amount,
        currency,
        raw,
        source,
        timestamp,
        year as i32,
        month as u32,
        day as u32,
        Quincena::from_number(quincena)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn expense(user: &str, label: &str, day: u32, hour: u32) -> Expense {
        Expense::new(
            user,
            label,
            10.0,
            "USD",
            format!("{label} 10"),
            Source::WhatsappCloud,
            Local.with_ymd_and_hms(2026, 8, day, hour, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gastos.sqlite");

        let db = Db::init(&path).await.unwrap();
        assert_eq!(db.count_expenses().await.unwrap(), 0);

        // A second init on the same path must refuse
        assert!(Db::init(&path).await.is_err());

        // Loading the existing file works and sees the same schema
        let db = Db::load(&path).await.unwrap();
        assert_eq!(db.count_expenses().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Db::load(dir.path().join("nope.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("gastos.sqlite")).await.unwrap();

        let original = expense("50761234567", "super", 7, 12);
        db.insert_expense(&original).await.unwrap();

        let found = db.recent_expenses(None, 10).await.unwrap();
        assert_eq!(found, vec![original]);
        assert_eq!(db.count_expenses().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_expenses_orders_newest_first_and_limits() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("gastos.sqlite")).await.unwrap();

        db.insert_expense(&expense("u1", "older", 1, 8)).await.unwrap();
        db.insert_expense(&expense("u1", "newest", 3, 8)).await.unwrap();
        db.insert_expense(&expense("u1", "middle", 2, 8)).await.unwrap();

        let found = db.recent_expenses(None, 2).await.unwrap();
        let labels: Vec<&str> = found.iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["newest", "middle"]);
    }

    #[tokio::test]
    async fn test_recent_expenses_filters_by_user() {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("gastos.sqlite")).await.unwrap();

        db.insert_expense(&expense("ana", "cafe", 1, 8)).await.unwrap();
        db.insert_expense(&expense("bob", "taxi", 2, 8)).await.unwrap();

        let found = db.recent_expenses(Some("ana"), 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label(), "cafe");
        assert_eq!(found[0].user_wa_id(), "ana");
    }
}
