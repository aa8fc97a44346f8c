use std::path::{Path, PathBuf};
use std::sync::Arc;

use wavemark::adapters::LocalFileAdapter;
use wavemark::app::AppContext;
use wavemark::config::Config;
use wavemark::index::IndexStore;
use wavemark::{decoder, hash, ingestion, matcher, peaks, spectrogram};

fn temp_db_path() -> PathBuf {
    let path = tempfile::NamedTempFile::new().unwrap().into_temp_path();
    let path_buf = path.to_path_buf();
    std::mem::forget(path);
    path_buf
}

fn fixture_ctx() -> AppContext {
    let db_path = temp_db_path();
    let url = db_path.to_str().unwrap().to_string();
    let store = IndexStore::new(&url).unwrap();
    wavemark::run_pending_migrations(&url).unwrap();
    AppContext::new(
        Config::default(),
        store,
        Arc::new(LocalFileAdapter),
        Arc::new(LocalFileAdapter),
    )
}

/// A track that varies over time (a new tone every second) so every
/// offset fingerprints distinctly, unlike a pure sustained tone.
fn varying_track(total_secs: u32, sample_rate: u32) -> Vec<f32> {
    let mut samples = Vec::with_capacity((total_secs * sample_rate) as usize);
    for sec in 0..total_secs {
        let freq = 300.0 + ((sec as u32 * 53) % 1400) as f32;
        for i in 0..sample_rate {
            let t = i as f32 / sample_rate as f32;
            let tremolo = 1.0 + 0.1 * (2.0 * std::f32::consts::PI * 5.0 * t).sin();
            samples.push(tremolo * (2.0 * std::f32::consts::PI * freq * t).sin());
        }
    }
    samples
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

fn fingerprint_samples(samples: &[f32], cfg: &Config) -> Vec<hash::FingerprintHash> {
    let spec = spectrogram::compute(samples, cfg.sample_rate, cfg).unwrap();
    let pks = peaks::find_peaks(&spec, cfg);
    hash::generate_hashes(&pks, cfg)
}

/// S1 — self match: ingesting a 60s tremolo tone and querying the full
/// file back recovers the same track at a near-zero offset.
#[test]
fn s1_self_match() {
    let ctx = fixture_ctx();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    let samples = varying_track(60, ctx.config.sample_rate);
    write_wav(&path, &samples, ctx.config.sample_rate);

    let result = ingestion::ingest_track(&ctx, path.to_str().unwrap());
    assert!(result.success, "ingest failed: {:?}", result.error);
    let track_id = result.track_id.unwrap();

    let (query_samples, sr) = decoder::decode_path(&path, ctx.config.sample_rate).unwrap();
    let query = fingerprint_samples(&query_samples, &ctx.config);
    assert_eq!(sr, ctx.config.sample_rate);

    let results = matcher::match_query(&ctx.store, &query, &ctx.config).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].track_id, track_id);
    assert!(results[0].offset_seconds >= 0.0 && results[0].offset_seconds <= 0.2);
}

/// S2 — mid-track snippet: querying bytes sliced from [30s, 37s] of a
/// 120s track finds the right track near a 30s offset.
#[test]
fn s2_mid_track_snippet() {
    let ctx = fixture_ctx();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song_a.wav");

    let sample_rate = ctx.config.sample_rate;
    let samples = varying_track(120, sample_rate);
    write_wav(&path, &samples, sample_rate);

    let result = ingestion::ingest_track(&ctx, path.to_str().unwrap());
    assert!(result.success, "ingest failed: {:?}", result.error);
    let track_id = result.track_id.unwrap();

    let start = (30.0 * sample_rate as f32) as usize;
    let end = (37.0 * sample_rate as f32) as usize;
    let snippet = &samples[start..end];
    let query = fingerprint_samples(snippet, &ctx.config);

    let results = matcher::match_query(&ctx.store, &query, &ctx.config).unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].track_id, track_id);
    assert!((results[0].offset_seconds - 30.0).abs() <= 0.2);
}

/// S3 — wrong-song rejection: querying with a track that was never
/// ingested yields no match (or a below-threshold score).
#[test]
fn s3_wrong_song_rejection() {
    let ctx = fixture_ctx();
    let dir = tempfile::tempdir().unwrap();
    let path_a = dir.path().join("song_a.wav");
    let sample_rate = ctx.config.sample_rate;

    write_wav(&path_a, &varying_track(60, sample_rate), sample_rate);
    let result = ingestion::ingest_track(&ctx, path_a.to_str().unwrap());
    assert!(result.success);

    let song_b = {
        let mut samples = Vec::new();
        for sec in 0..60u32 {
            let freq = 900.0 - ((sec * 71) % 700) as f32;
            for i in 0..sample_rate {
                let t = i as f32 / sample_rate as f32;
                samples.push((2.0 * std::f32::consts::PI * freq * t).sin());
            }
        }
        samples
    };
    let query = fingerprint_samples(&song_b, &ctx.config);

    let results = matcher::match_query(&ctx.store, &query, &ctx.config).unwrap();
    assert!(results.is_empty() || results[0].score < ctx.config.min_absolute_matches);
}

/// S4 — duplicate ingest: ingesting the same source twice yields the
/// same track id, `already_exists` on the second call, and one row.
#[test]
fn s4_duplicate_ingest_is_idempotent() {
    let ctx = fixture_ctx();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song_a.wav");
    write_wav(&path, &varying_track(10, ctx.config.sample_rate), ctx.config.sample_rate);

    let first = ingestion::ingest_track(&ctx, path.to_str().unwrap());
    assert!(first.success);
    assert_eq!(first.status.as_deref(), Some("added"));

    let second = ingestion::ingest_track(&ctx, path.to_str().unwrap());
    assert!(second.success);
    assert_eq!(second.status.as_deref(), Some("already_exists"));
    assert_eq!(first.track_id, second.track_id);

    assert_eq!(ctx.store.list_tracks().unwrap().len(), 1);
}

/// S5 — playlist progress: a 10-track playlist transitions
/// pending -> running -> completed with processed_items reaching 10 and
/// success_count + (total - success_count) == 10.
#[test]
fn s5_playlist_progress_reaches_total() {
    let ctx = fixture_ctx();
    let dir = tempfile::tempdir().unwrap();
    for i in 0..10 {
        let path = dir.path().join(format!("track_{i}.wav"));
        write_wav(&path, &varying_track(5, ctx.config.sample_rate), ctx.config.sample_rate);
    }

    let task_id = ingestion::ingest_playlist(&ctx, dir.path().to_str().unwrap()).unwrap();
    let task = ctx.tasks.get(&task_id).unwrap().unwrap();

    assert_eq!(task.status, "completed");
    assert_eq!(task.processed_items, 10);
    assert_eq!(task.total_items, 10);

    let blob: serde_json::Value = serde_json::from_str(task.result_blob.as_ref().unwrap()).unwrap();
    let success_count = blob["success_count"].as_i64().unwrap();
    let total_tracks = blob["total_tracks"].as_i64().unwrap();
    assert_eq!(total_tracks, 10);
    assert!(success_count <= total_tracks);
}

/// S6 — track deletion cascades: after deleting an ingested track,
/// recognizing its original audio no longer matches and no postings for
/// it remain.
#[test]
fn s6_deletion_cascades_to_postings() {
    let ctx = fixture_ctx();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song_a.wav");
    let sample_rate = ctx.config.sample_rate;
    let samples = varying_track(30, sample_rate);
    write_wav(&path, &samples, sample_rate);

    let result = ingestion::ingest_track(&ctx, path.to_str().unwrap());
    assert!(result.success);
    let track_id = result.track_id.unwrap();

    let query = fingerprint_samples(&samples, &ctx.config);
    let hashes: Vec<u32> = query.iter().map(|h| h.value).collect();
    assert!(!ctx.store.lookup(&hashes).unwrap().is_empty());

    assert!(ctx.store.delete_track(track_id).unwrap());

    assert!(ctx.store.lookup(&hashes).unwrap().is_empty());

    let results = matcher::match_query(&ctx.store, &query, &ctx.config).unwrap();
    assert!(results.iter().all(|r| r.track_id != track_id));
}
