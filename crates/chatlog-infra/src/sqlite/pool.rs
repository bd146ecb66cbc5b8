//! Connections to the conversation log database.
//!
//! Appends and index changes go through one writer connection, so SQLite
//! never sees two of them at once. Reads of recent history use a separate
//! read-only pool and keep working while a write is in flight (WAL).

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// File name of the log database inside the data directory.
pub const DATABASE_FILE: &str = "chatlog.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader and writer pools over one conversation log database.
#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only connections for history queries and index listing.
    pub reader: SqlitePool,
    /// The only connection allowed to modify records or the index catalog.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (or create) the database at `database_url` and bring its schema
    /// up to date before any reader connects.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }

    /// Open `{data_dir}/chatlog.db`.
    pub async fn open_in(data_dir: &Path) -> Result<Self, sqlx::Error> {
        let url = format!("sqlite://{}", data_dir.join(DATABASE_FILE).display());
        Self::new(&url).await
    }

    /// Close both pools. Later queries fail as unavailable.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

/// `CHATLOG_DATA_DIR` if set, else `$HOME/.chatlog`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHATLOG_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".chatlog")
}
