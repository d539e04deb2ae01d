//! Policy persistence operations on the `policies` table.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::state::PolicyRecord;

/// Insert a policy or replace the text of an existing one.
///
/// `created_at` is kept from the first insert; `updated_at` is set to `now`.
pub async fn upsert<'e, E>(
    executor: E,
    filename: &str,
    text: &str,
    now: DateTime<Utc>,
) -> Result<PolicyRecord, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, PolicyRow>(
        "INSERT INTO policies (filename, text, created_at, updated_at)
         VALUES ($1, $2, $3, $3)
         ON CONFLICT (filename) DO UPDATE
            SET text = EXCLUDED.text, updated_at = EXCLUDED.updated_at
         RETURNING filename, text, created_at, updated_at",
    )
    .bind(filename)
    .bind(text)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(row.into_record())
}

/// All policies, ordered by filename.
pub async fn list_all(pool: &PgPool) -> Result<Vec<PolicyRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PolicyRow>(
        "SELECT filename, text, created_at, updated_at FROM policies ORDER BY filename",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PolicyRow::into_record).collect())
}

/// Delete a policy. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, filename: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM policies WHERE filename = $1")
        .bind(filename)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PolicyRow {
    filename: String,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PolicyRow {
    fn into_record(self) -> PolicyRecord {
        PolicyRecord {
            filename: self.filename,
            text: self.text,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
