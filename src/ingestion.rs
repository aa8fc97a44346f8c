use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::app::AppContext;
use crate::error::Result;
use crate::hash;
use crate::models::TaskType;
use crate::peaks;
use crate::spectrogram;

/// Outcome of ingesting a single track, per spec section 4.7. Failures are
/// carried in the struct rather than surfaced as an `Err` so a failed child
/// never fails the parent playlist task.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub success: bool,
    pub track_id: Option<i32>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub url: String,
    pub error: Option<String>,
}

/// `decode -> spectrogram -> peaks -> hashes -> insert_track_with_postings`.
/// The track row and its postings are only persisted once the hash set is
/// known to be non-empty, in a single transaction — a track is never
/// visible in the index with zero postings (spec section 7). Temp file
/// cleanup happens unconditionally even if decoding fails.
pub fn ingest_track(ctx: &AppContext, source_url: &str) -> IngestResult {
    match ingest_track_inner(ctx, source_url) {
        Ok(result) => result,
        Err(e) => {
            warn!(url = source_url, error = %e, "track ingestion failed");
            IngestResult {
                success: false,
                track_id: None,
                status: None,
                title: None,
                artist: None,
                url: source_url.to_string(),
                error: Some(e.to_string()),
            }
        }
    }
}

fn ingest_track_inner(ctx: &AppContext, source_url: &str) -> Result<IngestResult> {
    let metadata = ctx.metadata_fetcher.get_track(source_url)?;

    if let Some(existing) = ctx
        .store
        .get_by_source(metadata.source_type, &metadata.source_id)?
    {
        return Ok(IngestResult {
            success: true,
            track_id: Some(existing.id),
            status: Some("already_exists".to_string()),
            title: Some(metadata.title),
            artist: Some(metadata.artist),
            url: source_url.to_string(),
            error: None,
        });
    }

    let (path, _media) = ctx.audio_fetcher.search_and_download(source_url)?;
    let decoded = crate::decoder::decode_path(&path, ctx.config.sample_rate);
    let _ = std::fs::remove_file(&path);
    let (samples, sample_rate) = decoded?;

    let spec = spectrogram::compute(&samples, sample_rate, &ctx.config)?;
    let pks = peaks::find_peaks(&spec, &ctx.config);
    let hashes = hash::generate_hashes(&pks, &ctx.config);

    let track_id = ctx.store.insert_track_with_postings(&metadata, &hashes)?;

    info!(track_id, hash_count = hashes.len(), "track ingested");

    Ok(IngestResult {
        success: true,
        track_id: Some(track_id),
        status: Some("added".to_string()),
        title: Some(metadata.title),
        artist: Some(metadata.artist),
        url: source_url.to_string(),
        error: None,
    })
}

/// Resolves a playlist, creates its task, then fans every track out across
/// a `rayon` worker pool sized to `Config::worker_count`. `processed_items`
/// advances monotonically as each child finishes; a failed child is
/// recorded in the result blob but never fails the task itself.
pub fn ingest_playlist(ctx: &AppContext, source_url: &str) -> Result<String> {
    let track_metas = ctx.metadata_fetcher.get_playlist(source_url)?;
    let urls: Vec<String> = track_metas.iter().map(|m| m.source_id.clone()).collect();

    let task_id = ctx
        .tasks
        .create(TaskType::Playlist, source_url, urls.len() as i32)?;
    ctx.tasks.mark_running(&task_id)?;

    let processed = Mutex::new(0i32);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.config.worker_count)
        .build()
        .map_err(|e| crate::error::WaveMarkError::Adapter(format!("worker pool: {e}")))?;

    let results: Vec<IngestResult> = pool.install(|| {
        urls.par_iter()
            .map(|url| {
                let result = ingest_track(ctx, url);
                let mut guard = processed.lock().unwrap();
                *guard += 1;
                let _ = ctx.tasks.update_progress(&task_id, *guard);
                result
            })
            .collect()
    });

    let success_count = AtomicI32::new(0);
    for r in &results {
        if r.success {
            success_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    let result_blob = serde_json::json!({
        "success_count": success_count.load(Ordering::Relaxed),
        "total_tracks": results.len(),
        "per_track_results": results,
    });
    ctx.tasks.mark_completed(&task_id, result_blob)?;

    Ok(task_id)
}
