pub mod adapters;
pub mod api;
pub mod app;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fft;
pub mod hash;
pub mod index;
pub mod ingestion;
pub mod matcher;
pub mod mic;
pub mod models;
pub mod peaks;
mod schema;
pub mod spectrogram;
pub mod tasks;
pub mod visualization;

pub use app::AppContext;
pub use config::Config;
pub use error::{Result, WaveMarkError};

use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies every pending migration to `database_url`, creating the schema
/// on a fresh file. Idempotent: already-applied migrations are skipped.
pub fn run_pending_migrations(database_url: &str) -> Result<()> {
    use diesel::Connection;
    use diesel_migrations::MigrationHarness;

    let mut conn = diesel::sqlite::SqliteConnection::establish(database_url)
        .map_err(|e| WaveMarkError::Store(format!("failed to open database for migrations: {e}")))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| WaveMarkError::Store(format!("failed to run pending migrations: {e}")))?;
    Ok(())
}
