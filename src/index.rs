use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;

use crate::error::{Result, WaveMarkError};
use crate::hash::FingerprintHash;
use crate::models::{NewPosting, NewTrack, Posting, SourceType, Track, TrackMetadata};
use crate::schema::{postings, tracks};

const POSTING_BATCH_SIZE: usize = 5_000;

#[derive(Debug)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 30000; PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Append-only inverted index plus the track table. Every pooled
/// connection gets `busy_timeout=30000` and `journal_mode=WAL` so writers
/// serialize per spec.md's 30-second lock budget without blocking readers.
#[derive(Clone)]
pub struct IndexStore {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

fn upsert_track_tx(conn: &mut SqliteConnection, metadata: &TrackMetadata) -> Result<i32> {
    if let Some(existing) = tracks::table
        .filter(tracks::source_type.eq(metadata.source_type.to_string()))
        .filter(tracks::source_id.eq(&metadata.source_id))
        .select(tracks::id)
        .first::<i32>(conn)
        .optional()?
    {
        return Ok(existing);
    }

    let new_track = NewTrack {
        title: metadata.title.clone(),
        artist: metadata.artist.clone(),
        album: metadata.album.clone(),
        source_type: metadata.source_type.to_string(),
        source_id: metadata.source_id.clone(),
        duration_ms: metadata.duration_ms,
        cover_url: metadata.cover_url.clone(),
        release_date: metadata.release_date.clone(),
        spotify_url: metadata.spotify_url.clone(),
        youtube_id: metadata.youtube_id.clone(),
        created_at: chrono::Utc::now().naive_utc(),
    };

    diesel::insert_into(tracks::table)
        .values(&new_track)
        .execute(conn)?;

    Ok(tracks::table
        .filter(tracks::source_type.eq(metadata.source_type.to_string()))
        .filter(tracks::source_id.eq(&metadata.source_id))
        .select(tracks::id)
        .first::<i32>(conn)?)
}

fn insert_postings_tx(
    conn: &mut SqliteConnection,
    track_id: i32,
    hashes: &[FingerprintHash],
) -> Result<usize> {
    let rows: Vec<NewPosting> = hashes
        .iter()
        .map(|h| NewPosting::new(h.value, track_id, h.anchor_time_idx))
        .collect();

    let mut total = 0usize;
    for batch in rows.chunks(POSTING_BATCH_SIZE) {
        total += diesel::insert_or_ignore_into(postings::table)
            .values(batch)
            .execute(conn)?;
    }
    Ok(total)
}

impl IndexStore {
    pub fn new(database_url: &str) -> Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .connection_customizer(Box::new(ConnectionPragmas))
            .build(manager)
            .map_err(|e| WaveMarkError::Store(format!("failed to build connection pool: {e}")))?;
        Ok(Self { pool })
    }

    /// Exposes a pooled connection to sibling store types (the task ledger)
    /// that share this same database file but own their own table.
    pub(crate) fn pooled_connection(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>> {
        Ok(self.pool.get()?)
    }

    /// Inserts a track or, if `(source_type, source_id)` already exists,
    /// returns the existing id without touching its row.
    pub fn upsert_track(&self, metadata: &TrackMetadata) -> Result<i32> {
        let mut conn = self.pool.get()?;
        conn.transaction(|conn| upsert_track_tx(conn, metadata))
    }

    /// Bulk-appends postings for a track in one transaction, in batches of
    /// [`POSTING_BATCH_SIZE`]. Duplicate `(hash, track_id, offset)` rows are
    /// silently discarded via `INSERT OR IGNORE`.
    pub fn insert_postings(&self, track_id: i32, hashes: &[FingerprintHash]) -> Result<usize> {
        if hashes.is_empty() {
            return Err(WaveMarkError::EmptyFingerprint);
        }
        let mut conn = self.pool.get()?;
        conn.transaction(|conn| insert_postings_tx(conn, track_id, hashes))
    }

    /// Upserts the track and inserts its postings as a single transaction:
    /// an empty hash set rolls back without ever creating the track row, so
    /// a track with zero postings never becomes visible to `get_by_source`
    /// (spec section 7 — ingestion must refuse to store a track with zero
    /// postings).
    pub fn insert_track_with_postings(
        &self,
        metadata: &TrackMetadata,
        hashes: &[FingerprintHash],
    ) -> Result<i32> {
        if hashes.is_empty() {
            return Err(WaveMarkError::EmptyFingerprint);
        }
        let mut conn = self.pool.get()?;
        conn.transaction(|conn| {
            let track_id = upsert_track_tx(conn, metadata)?;
            insert_postings_tx(conn, track_id, hashes)?;
            Ok(track_id)
        })
    }

    /// Returns every posting whose hash is in `hashes`. No ordering
    /// guarantee.
    pub fn lookup(&self, hashes: &[u32]) -> Result<Vec<Posting>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get()?;
        let signed: Vec<i32> = hashes.iter().map(|&h| h as i32).collect();

        let mut results = Vec::new();
        for batch in signed.chunks(POSTING_BATCH_SIZE) {
            let rows = postings::table
                .filter(postings::hash.eq_any(batch))
                .load::<Posting>(&mut conn)?;
            results.extend(rows);
        }
        Ok(results)
    }

    pub fn get_track(&self, track_id: i32) -> Result<Option<Track>> {
        let mut conn = self.pool.get()?;
        Ok(tracks::table
            .find(track_id)
            .first::<Track>(&mut conn)
            .optional()?)
    }

    pub fn get_by_source(&self, source_type: SourceType, source_id: &str) -> Result<Option<Track>> {
        let mut conn = self.pool.get()?;
        Ok(tracks::table
            .filter(tracks::source_type.eq(source_type.to_string()))
            .filter(tracks::source_id.eq(source_id))
            .first::<Track>(&mut conn)
            .optional()?)
    }

    pub fn get_by_spotify_url(&self, url: &str) -> Result<Option<Track>> {
        let mut conn = self.pool.get()?;
        Ok(tracks::table
            .filter(tracks::spotify_url.eq(url))
            .first::<Track>(&mut conn)
            .optional()?)
    }

    pub fn list_tracks(&self) -> Result<Vec<Track>> {
        let mut conn = self.pool.get()?;
        Ok(tracks::table.load::<Track>(&mut conn)?)
    }

    /// Deletes the track and, via `ON DELETE CASCADE`, all its postings.
    /// Returns `false` if the track did not exist.
    pub fn delete_track(&self, track_id: i32) -> Result<bool> {
        let mut conn = self.pool.get()?;
        let affected = diesel::delete(tracks::table.find(track_id)).execute(&mut conn)?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
impl IndexStore {
    /// Applies the embedded schema to a fresh temp-file database. Test-only:
    /// production wiring runs migrations once at startup via
    /// `diesel_migrations`.
    pub(crate) fn apply_migrations_for_test(&self) {
        let mut conn = self.pool.get().unwrap();
        conn.batch_execute(include_str!("../migrations/2024-01-01-000000_init/up.sql"))
            .unwrap();
    }
}
