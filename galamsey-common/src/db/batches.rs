//! Upload batch queries

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::db::models::UploadBatch;
use crate::{Error, Result};

fn batch_from_row(row: &SqliteRow) -> Result<UploadBatch> {
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(UploadBatch {
        id: row.get("id"),
        filename: row.get("filename"),
        created_at,
        record_count: row.get("record_count"),
    })
}

/// Insert the batch row for a new upload (record count starts at 0)
pub async fn create_batch(
    conn: &mut SqliteConnection,
    filename: &str,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO upload_batches (filename, created_at, record_count) VALUES (?, ?, 0) RETURNING id",
    )
    .bind(filename)
    .bind(created_at.to_rfc3339())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Set the final record count before the upload transaction commits
pub async fn set_record_count(conn: &mut SqliteConnection, batch_id: i64, count: i64) -> Result<()> {
    sqlx::query("UPDATE upload_batches SET record_count = ? WHERE id = ?")
        .bind(count)
        .bind(batch_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Load one batch
pub async fn get_batch(pool: &SqlitePool, batch_id: i64) -> Result<Option<UploadBatch>> {
    let row = sqlx::query(
        "SELECT id, filename, created_at, record_count FROM upload_batches WHERE id = ?",
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(batch_from_row).transpose()
}

/// All batches, newest first
pub async fn list_batches(pool: &SqlitePool) -> Result<Vec<UploadBatch>> {
    let rows = sqlx::query(
        "SELECT id, filename, created_at, record_count FROM upload_batches ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(batch_from_row).collect()
}

/// Delete a batch and, by cascade, its records
///
/// Returns the number of site records removed with it, or `None` when the
/// batch does not exist.
pub async fn delete_batch(pool: &SqlitePool, batch_id: i64) -> Result<Option<u64>> {
    let mut tx = pool.begin().await?;

    let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site_records WHERE batch_id = ?")
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM upload_batches WHERE id = ?")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(Some(owned as u64))
}
