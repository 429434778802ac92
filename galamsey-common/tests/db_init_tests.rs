//! Tests for database initialization and the record/batch queries

use galamsey_common::db::{batches, init_database, sites, NewSiteRecord};
use galamsey_common::Error;
use tempfile::TempDir;

async fn fresh_pool(dir: &TempDir) -> sqlx::SqlitePool {
    init_database(&dir.path().join("galamsey.db"))
        .await
        .expect("Database initialization failed")
}

fn new_record(town: &str, region: &str, count: i64) -> NewSiteRecord {
    NewSiteRecord {
        town: town.to_string(),
        region: region.to_string(),
        site_count: count,
    }
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("galamsey.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("galamsey.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sites::insert_site(&pool1, &new_record("Tarkwa", "Western", 3))
        .await
        .unwrap();
    pool1.close().await;

    // Reopening keeps the data and re-running the schema is harmless
    let pool2 = init_database(&db_path).await.unwrap();
    let records = sites::list_sites(&pool2).await.unwrap();
    assert_eq!(records.len(), 1);

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(version, galamsey_common::db::SCHEMA_VERSION);
}

#[tokio::test]
async fn test_insert_and_list_sites() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let created = sites::insert_site(&pool, &new_record("Accra", "Greater Accra", 5))
        .await
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.batch_id, None);

    sites::insert_site(&pool, &new_record("Kumasi", "Ashanti", 10))
        .await
        .unwrap();

    let records = sites::list_sites(&pool).await.unwrap();
    let towns: Vec<&str> = records.iter().map(|r| r.town.as_str()).collect();
    assert_eq!(towns, vec!["Accra", "Kumasi"]);
}

#[tokio::test]
async fn test_insert_duplicate_pair_is_rejected() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    sites::insert_site(&pool, &new_record("Accra", "Greater Accra", 5))
        .await
        .unwrap();
    let result = sites::insert_site(&pool, &new_record("Accra", "Greater Accra", 9)).await;

    assert!(matches!(result, Err(Error::Duplicate(_))));
    assert_eq!(sites::list_sites(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_sites_by_id() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let a = sites::insert_site(&pool, &new_record("A", "R", 1)).await.unwrap();
    let b = sites::insert_site(&pool, &new_record("B", "R", 2)).await.unwrap();
    let c = sites::insert_site(&pool, &new_record("C", "R", 3)).await.unwrap();

    let deleted = sites::delete_sites(&pool, &[a.id, c.id, 9999]).await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = sites::list_sites(&pool).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b.id);

    assert_eq!(sites::delete_sites(&pool, &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_batch_cascades_to_records() {
    let dir = TempDir::new().unwrap();
    let pool = fresh_pool(&dir).await;

    let summary = galamsey_common::ingest::ingest_csv(
        &pool,
        "sites.csv",
        b"Town,Region,Number_of_Galamsay_Sites\nA,R1,1\nB,R2,2\n",
        Default::default(),
    )
    .await
    .unwrap();
    sites::insert_site(&pool, &new_record("Loose", "R3", 4))
        .await
        .unwrap();

    let removed = batches::delete_batch(&pool, summary.batch.id).await.unwrap();
    assert_eq!(removed, Some(2));

    let remaining = sites::list_sites(&pool).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].town, "Loose");

    assert!(batches::get_batch(&pool, summary.batch.id).await.unwrap().is_none());
    assert_eq!(batches::delete_batch(&pool, summary.batch.id).await.unwrap(), None);
}
