use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

/// Creates a fresh database at `url`, dropping any previous one, and brings its schema up to date.
pub async fn prepare_test_db(url: &str) -> Result<SqliteDatabase, sqlx::Error> {
    create_database(url).await?;
    let db = SqliteDatabase::new_with_url(url, 5).await?;
    db.migrate().await?;
    Ok(db)
}

/// A database URL in the system temp directory that no other test will use.
pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/tkt_test_store_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn create_database(url: &str) -> Result<(), sqlx::Error> {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await?;
    info!("Created Sqlite database {url}");
    Ok(())
}

pub async fn drop_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
}
