use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);

    if is_in_memory(database_url) {
        // Every pooled connection to an in-memory database is a separate
        // database, so the pool must hold exactly one.
        opt.max_connections(1).min_connections(1);
    } else {
        // SQLite serialises writers; chunked deletes gain nothing past ~10 connections
        opt.max_connections(10)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(3600));
    }

    opt.connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    Database::connect(opt).await
}

pub fn get_database_url(database_path: Option<&str>) -> String {
    match database_path {
        Some(":memory:") => "sqlite::memory:".to_string(),
        Some(path) if path.starts_with("sqlite:") => path.to_string(),
        Some(path) => format!("sqlite://{}?mode=rwc", path),
        None => "sqlite://greenledger.db?mode=rwc".to_string(),
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_forms() {
        assert_eq!(get_database_url(Some(":memory:")), "sqlite::memory:");
        assert_eq!(
            get_database_url(Some("ledger.db")),
            "sqlite://ledger.db?mode=rwc"
        );
        assert_eq!(
            get_database_url(Some("sqlite://other.db")),
            "sqlite://other.db"
        );
        assert_eq!(get_database_url(None), "sqlite://greenledger.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_establish_connection_on_file_database() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ledger.db");
        let url = get_database_url(path.to_str());

        let db = establish_connection(&url).await.expect("connect");
        crate::database::setup_database(&db).await.expect("migrate");
    }
}
