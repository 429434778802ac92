//! End-to-end tests for the CSV ingestion pipeline against a real SQLite file

use galamsey_common::db::{batches, init_database, sites};
use galamsey_common::ingest::{ingest_csv, IngestMode, IngestOptions, ParseError, SkipKind};
use galamsey_common::Error;
use sqlx::SqlitePool;
use tempfile::TempDir;

const HEADER: &str = "Town,Region,Number_of_Galamsay_Sites\n";

async fn fresh_pool(dir: &TempDir) -> SqlitePool {
    init_database(&dir.path().join("galamsey.db")).await.unwrap()
}

fn csv(rows: &[&str]) -> Vec<u8> {
    let mut text = HEADER.to_string();
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text.into_bytes()
}

#[tokio::test]
async fn test_valid_file_creates_one_batch_with_all_rows() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let bytes = csv(&["Accra,Greater Accra,5", "Kumasi,Ashanti,10", "Tarkwa,Western,7"]);
    let summary = ingest_csv(&pool, "sites.csv", &bytes, IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.invalid, 0);
    assert_eq!(summary.batch.record_count, 3);
    assert_eq!(summary.batch.filename, "sites.csv");

    let stored = batches::list_batches(&pool).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].record_count, 3);

    let records = sites::list_sites_for_batch(&pool, summary.batch.id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.batch_id == Some(summary.batch.id)));

    assert_eq!(summary.analysis.total_galamsey_sites, Some(22));
}

#[tokio::test]
async fn test_reupload_updates_count_in_place() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    ingest_csv(&pool, "first.csv", &csv(&["Accra,Greater Accra,5"]), IngestOptions::default())
        .await
        .unwrap();
    let second = ingest_csv(
        &pool,
        "second.csv",
        &csv(&["Accra,Greater Accra,9"]),
        IngestOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(second.duplicates, 0);

    let records = sites::list_sites(&pool).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].site_count, 9);
    assert_eq!(records[0].batch_id, Some(second.batch.id));
}

#[tokio::test]
async fn test_strict_mode_reports_duplicates() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    ingest_csv(&pool, "first.csv", &csv(&["Accra,Greater Accra,5"]), IngestOptions::default())
        .await
        .unwrap();

    let options = IngestOptions {
        threshold: None,
        mode: IngestMode::Strict,
    };
    let summary = ingest_csv(
        &pool,
        "second.csv",
        &csv(&["Accra,Greater Accra,9", "Kumasi,Ashanti,10"]),
        options,
    )
    .await
    .unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.batch.record_count, 1);
    assert_eq!(summary.skipped_rows.len(), 1);
    assert_eq!(summary.skipped_rows[0].kind, SkipKind::Duplicate);
    assert_eq!(summary.skipped_rows[0].line, 2);

    let records = sites::list_sites(&pool).await.unwrap();
    let accra = records.iter().find(|r| r.town == "Accra").unwrap();
    assert_eq!(accra.site_count, 5);
}

#[tokio::test]
async fn test_invalid_rows_skipped_valid_rows_kept() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let bytes = csv(&[
        "Accra,Greater Accra,5",
        "Obuasi,Ashanti,-3",
        "Tema,Greater Accra,lots",
        "Kumasi,Ashanti,10",
    ]);
    let summary = ingest_csv(&pool, "mixed.csv", &bytes, IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.invalid, 2);
    let lines: Vec<u64> = summary.skipped_rows.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![3, 4]);
    assert!(summary.skipped_rows.iter().all(|s| !s.reason.is_empty()));

    let towns: Vec<String> = sites::list_sites(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.town)
        .collect();
    assert_eq!(towns, vec!["Accra", "Kumasi"]);
}

#[tokio::test]
async fn test_bad_header_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let result = ingest_csv(
        &pool,
        "bad.csv",
        b"City,Area,Count\nAccra,Greater Accra,5\n",
        IngestOptions::default(),
    )
    .await;

    assert!(matches!(result, Err(Error::Ingest(ParseError::Schema(_)))));
    assert!(batches::list_batches(&pool).await.unwrap().is_empty());
    assert!(sites::list_sites(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_file_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let result = ingest_csv(&pool, "bad.csv", b"\xc3\x28garbage", IngestOptions::default()).await;

    assert!(matches!(result, Err(Error::Ingest(ParseError::Decode(_)))));
    assert!(batches::list_batches(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_analysis_scoped_to_batch_with_threshold() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    ingest_csv(&pool, "other.csv", &csv(&["Elsewhere,R9,1000"]), IngestOptions::default())
        .await
        .unwrap();

    let options = IngestOptions {
        threshold: Some(20),
        mode: IngestMode::Upsert,
    };
    let summary = ingest_csv(&pool, "sample.csv", &csv(&["T1,R1,20", "T2,R1,30", "T3,R2,50"]), options)
        .await
        .unwrap();

    let analysis = &summary.analysis;
    assert_eq!(analysis.total_galamsey_sites, Some(100));
    assert_eq!(analysis.average_galamsey_sites_per_region.len(), 2);
    assert_eq!(analysis.average_galamsey_sites_per_region[0].avg_sites, 25.0);
    assert_eq!(
        analysis.region_with_highest_galamsey_sites.as_ref().unwrap().region,
        "R2"
    );
    let above = analysis.regions_above_threshold.as_ref().unwrap();
    assert_eq!(above.len(), 2);
}

#[tokio::test]
async fn test_header_only_file_creates_empty_batch() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let summary = ingest_csv(&pool, "empty.csv", HEADER.as_bytes(), IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.batch.record_count, 0);
    assert_eq!(summary.analysis.total_galamsey_sites, None);
    assert_eq!(batches::list_batches(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeated_pair_within_file_counted_once() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let bytes = csv(&["Accra,Greater Accra,5", "Kumasi,Ashanti,10", "Accra,Greater Accra,9"]);
    let summary = ingest_csv(&pool, "repeats.csv", &bytes, IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.skipped_rows.len(), 1);
    assert_eq!(summary.skipped_rows[0].kind, SkipKind::Duplicate);
    assert_eq!(summary.skipped_rows[0].line, 4);
    assert!(summary.skipped_rows[0].reason.contains("line 2"));

    // Stored count matches the records the batch owns
    let stored = batches::get_batch(&pool, summary.batch.id)
        .await
        .unwrap()
        .unwrap();
    let owned = sites::list_sites_for_batch(&pool, summary.batch.id)
        .await
        .unwrap();
    assert_eq!(stored.record_count, 2);
    assert_eq!(owned.len(), 2);

    // First occurrence wins
    let accra = owned.iter().find(|r| r.town == "Accra").unwrap();
    assert_eq!(accra.site_count, 5);
}

#[tokio::test]
async fn test_repeated_pair_after_update_counted_once() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    ingest_csv(&pool, "first.csv", &csv(&["Accra,Greater Accra,1"]), IngestOptions::default())
        .await
        .unwrap();
    let summary = ingest_csv(
        &pool,
        "second.csv",
        &csv(&["Accra,Greater Accra,5", "Accra,Greater Accra,9"]),
        IngestOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.batch.record_count, 1);
    assert_eq!(
        sites::list_sites_for_batch(&pool, summary.batch.id)
            .await
            .unwrap()
            .len(),
        1
    );
}
