//! Site record queries

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

use crate::db::models::{NewSiteRecord, SiteRecord};
use crate::ingest::{IngestMode, SiteRow};
use crate::{Error, Result};

/// Result of storing one CSV row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New (town, region) pair
    Inserted(i64),
    /// Existing pair, count overwritten
    Updated(i64),
    /// Existing pair left untouched (strict mode)
    Duplicate,
}

fn site_from_row(row: &SqliteRow) -> SiteRecord {
    SiteRecord {
        id: row.get("id"),
        town: row.get("town"),
        region: row.get("region"),
        site_count: row.get("site_count"),
        batch_id: row.get("batch_id"),
    }
}

/// All site records ordered by id
pub async fn list_sites(pool: &SqlitePool) -> Result<Vec<SiteRecord>> {
    let rows = sqlx::query(
        "SELECT id, town, region, site_count, batch_id FROM site_records ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(site_from_row).collect())
}

/// Site records owned by one upload batch
pub async fn list_sites_for_batch(pool: &SqlitePool, batch_id: i64) -> Result<Vec<SiteRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, town, region, site_count, batch_id
        FROM site_records
        WHERE batch_id = ?
        ORDER BY id
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(site_from_row).collect())
}

/// Insert a record without a batch owner
///
/// Returns `Error::Duplicate` when the (town, region) pair already exists.
pub async fn insert_site(pool: &SqlitePool, record: &NewSiteRecord) -> Result<SiteRecord> {
    let result = sqlx::query(
        r#"
        INSERT INTO site_records (town, region, site_count, batch_id)
        VALUES (?, ?, ?, NULL)
        RETURNING id, town, region, site_count, batch_id
        "#,
    )
    .bind(&record.town)
    .bind(&record.region)
    .bind(record.site_count)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(site_from_row(&row)),
        Err(e) => {
            let err = Error::from(e);
            if err.is_unique_violation() {
                Err(Error::Duplicate(format!(
                    "A record for town '{}' in region '{}' already exists",
                    record.town, record.region
                )))
            } else {
                Err(err)
            }
        }
    }
}

/// Delete records by id, returning how many rows were removed
pub async fn delete_sites(pool: &SqlitePool, ids: &[i64]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("DELETE FROM site_records WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// Store one validated CSV row inside the caller's transaction
///
/// The insert attempt and the follow-up update run on the same connection
/// while the transaction holds the SQLite write lock, so two concurrent
/// uploads cannot both insert the same pair.
pub async fn upsert_site(
    conn: &mut SqliteConnection,
    row: &SiteRow,
    batch_id: i64,
    mode: IngestMode,
) -> Result<UpsertOutcome> {
    let inserted: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO site_records (town, region, site_count, batch_id)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(town, region) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&row.town)
    .bind(&row.region)
    .bind(row.site_count)
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = inserted {
        return Ok(UpsertOutcome::Inserted(id));
    }

    if mode == IngestMode::Strict {
        return Ok(UpsertOutcome::Duplicate);
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        UPDATE site_records
        SET site_count = ?, batch_id = ?
        WHERE town = ? AND region = ?
        RETURNING id
        "#,
    )
    .bind(row.site_count)
    .bind(batch_id)
    .bind(&row.town)
    .bind(&row.region)
    .fetch_one(&mut *conn)
    .await?;

    Ok(UpsertOutcome::Updated(id))
}
