//! Ingestion pipeline: parse → validate → upsert → summarize
//!
//! One call creates exactly one upload batch. The batch row and all of its
//! site records are written in a single transaction, so a failure part-way
//! leaves no orphaned batch behind.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

use crate::db::sites::UpsertOutcome;
use crate::db::{batches, sites, UploadBatch};
use crate::ingest::parser::{parse_csv, SkippedRow};
use crate::stats::{analyze, Analysis};
use crate::{Error, Result};

/// How an already-known (town, region) pair is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Overwrite the stored count and move the record to the new batch
    #[default]
    Upsert,
    /// Leave the stored record alone and report the row as a duplicate
    Strict,
}

impl FromStr for IngestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "upsert" => Ok(IngestMode::Upsert),
            "strict" => Ok(IngestMode::Strict),
            other => Err(Error::InvalidInput(format!(
                "Unknown ingest mode '{}' (expected 'upsert' or 'strict')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    pub threshold: Option<i64>,
    pub mode: IngestMode,
}

/// Result of one upload
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub message: String,
    pub batch: UploadBatch,
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub skipped_rows: Vec<SkippedRow>,
    pub analysis: Analysis,
}

/// Ingest one CSV file into a new upload batch
///
/// Decode and header errors return before anything is written.
pub async fn ingest_csv(
    pool: &SqlitePool,
    filename: &str,
    bytes: &[u8],
    options: IngestOptions,
) -> Result<IngestSummary> {
    let parsed = parse_csv(bytes)?;
    debug!(
        filename,
        accepted = parsed.rows.len(),
        invalid = parsed.invalid.len(),
        "Parsed CSV upload"
    );

    let created_at = Utc::now();
    let mut tx = pool.begin().await?;

    let batch_id = batches::create_batch(&mut *tx, filename, created_at).await?;

    let mut inserted = 0usize;
    let mut updated = 0usize;
    let mut duplicate_rows = Vec::new();
    // First line of every pair stored by this batch; later repeats are skipped
    let mut seen: HashMap<(&str, &str), u64> = HashMap::new();

    for row in &parsed.rows {
        if let Some(&first_line) = seen.get(&(row.town.as_str(), row.region.as_str())) {
            duplicate_rows.push(SkippedRow::repeated(row, first_line));
            continue;
        }

        match sites::upsert_site(&mut *tx, row, batch_id, options.mode).await {
            Ok(UpsertOutcome::Inserted(_)) => {
                inserted += 1;
                seen.insert((row.town.as_str(), row.region.as_str()), row.line);
            }
            Ok(UpsertOutcome::Updated(_)) => {
                updated += 1;
                seen.insert((row.town.as_str(), row.region.as_str()), row.line);
            }
            Ok(UpsertOutcome::Duplicate) => duplicate_rows.push(SkippedRow::duplicate(row)),
            // A constraint hit is reported like any other duplicate
            Err(e) if e.is_unique_violation() => duplicate_rows.push(SkippedRow::duplicate(row)),
            Err(e) => return Err(e),
        }
    }

    let record_count = (inserted + updated) as i64;
    batches::set_record_count(&mut *tx, batch_id, record_count).await?;
    tx.commit().await?;

    let invalid = parsed.invalid.len();
    let duplicates = duplicate_rows.len();

    let mut skipped_rows = parsed.invalid;
    skipped_rows.extend(duplicate_rows);
    skipped_rows.sort_by_key(|s| s.line);

    info!(
        batch_id,
        filename,
        inserted,
        updated,
        duplicates,
        invalid,
        "CSV upload stored"
    );

    let records = sites::list_sites_for_batch(pool, batch_id).await?;

    Ok(IngestSummary {
        message: "CSV uploaded successfully".to_string(),
        batch: UploadBatch {
            id: batch_id,
            filename: filename.to_string(),
            created_at,
            record_count,
        },
        inserted,
        updated,
        duplicates,
        invalid,
        skipped_rows,
        analysis: analyze(&records, options.threshold),
    })
}
