use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{postings, tasks, tracks};

/// Catalog a track's metadata came from. Closed set per spec section 3 —
/// kept as an enum rather than a free string so ingestion and task
/// summaries get compile-time exhaustiveness on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Spotify,
    Youtube,
    File,
    Local,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Spotify => "spotify",
            SourceType::Youtube => "youtube",
            SourceType::File => "file",
            SourceType::Local => "local",
        };
        f.write_str(s)
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spotify" => Ok(SourceType::Spotify),
            "youtube" => Ok(SourceType::Youtube),
            "file" => Ok(SourceType::File),
            "local" => Ok(SourceType::Local),
            other => Err(format!("unknown source_type: {other}")),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize)]
#[diesel(table_name = tracks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Track {
    pub id: i32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub source_type: String,
    pub source_id: String,
    pub duration_ms: Option<i32>,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
    pub spotify_url: Option<String>,
    pub youtube_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Track {
    pub fn source_type(&self) -> SourceType {
        self.source_type
            .parse()
            .expect("source_type column holds a value written by upsert_track")
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tracks)]
pub struct NewTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub source_type: String,
    pub source_id: String,
    pub duration_ms: Option<i32>,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
    pub spotify_url: Option<String>,
    pub youtube_id: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Metadata supplied by an adapter, ahead of becoming a stored [`Track`].
#[derive(Debug, Clone)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub source_type: SourceType,
    pub source_id: String,
    pub duration_ms: Option<i32>,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
    pub spotify_url: Option<String>,
    pub youtube_id: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = postings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Posting {
    pub id: i32,
    pub hash: i32,
    pub track_id: i32,
    pub offset: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = postings)]
pub struct NewPosting {
    pub hash: i32,
    pub track_id: i32,
    pub offset: i32,
}

/// Packs a [`crate::hash::FingerprintHash`] into a storable posting row.
/// The hash is stored bit-for-bit in a `i32` column; `as i32`/`as u32` casts
/// are lossless reinterpretations of the same 32 bits, never a truncation.
impl NewPosting {
    pub fn new(hash_value: u32, track_id: i32, offset: u32) -> Self {
        Self {
            hash: hash_value as i32,
            track_id,
            offset: offset as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    Track,
    Playlist,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskType::Track => "track",
            TaskType::Playlist => "playlist",
        })
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" => Ok(TaskType::Track),
            "playlist" => Ok(TaskType::Playlist),
            other => Err(format!("unknown task_type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        })
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = tasks)]
#[diesel(primary_key(task_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Task {
    pub task_id: String,
    pub task_type: String,
    pub source_url: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub processed_items: i32,
    pub total_items: i32,
    pub result_blob: Option<String>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tasks)]
pub struct NewTask {
    pub task_id: String,
    pub task_type: String,
    pub source_url: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub processed_items: i32,
    pub total_items: i32,
    pub result_blob: Option<String>,
}
