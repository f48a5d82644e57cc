use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Connection target for a test database.
///
/// In-memory SQLite lives only as long as its connection, so every pool
/// built here holds exactly one.
pub struct TestDb {
    url: String,
}

impl TestDb {
    pub fn new_in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }

    pub fn new_file(path: impl Into<String>) -> Self {
        let path = path.into();
        let url = if path.starts_with("sqlite:") {
            path
        } else {
            format!("sqlite://{}?mode=rwc", path)
        };
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        Database::connect(options).await
    }
}
