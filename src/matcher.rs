use std::collections::{BTreeMap, HashMap};

use crate::config::Config;
use crate::error::Result;
use crate::hash::FingerprintHash;
use crate::index::IndexStore;

/// One ranked candidate returned by [`match_query`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub track_id: i32,
    pub score: usize,
    pub offset_seconds: f32,
}

/// Ranks tracks by time-coherent histogram alignment against a query
/// fingerprint set, per spec section 4.6. Never errors: unknown or empty
/// inputs yield an empty result.
pub fn match_query(
    store: &IndexStore,
    query: &[FingerprintHash],
    cfg: &Config,
) -> Result<Vec<MatchResult>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    // If a hash repeats in the query, the last-seen anchor offset wins.
    let mut query_offset_by_hash: HashMap<u32, u32> = HashMap::new();
    for h in query {
        query_offset_by_hash.insert(h.value, h.anchor_time_idx);
    }

    let query_hashes: Vec<u32> = query_offset_by_hash.keys().copied().collect();
    let postings = store.lookup(&query_hashes)?;
    if postings.is_empty() {
        return Ok(Vec::new());
    }

    let mut hist: HashMap<i32, BTreeMap<i64, usize>> = HashMap::new();
    for posting in postings {
        let hash_value = posting.hash as u32;
        let Some(&query_offset) = query_offset_by_hash.get(&hash_value) else {
            continue;
        };
        let delta = posting.offset as i64 - query_offset as i64;
        *hist.entry(posting.track_id).or_default().entry(delta).or_insert(0) += 1;
    }

    let mut results: Vec<MatchResult> = hist
        .into_iter()
        .filter_map(|(track_id, deltas)| {
            // Ties in count favor the smaller delta.
            let (&best_delta, &score) = deltas
                .iter()
                .max_by_key(|&(delta, count)| (*count, std::cmp::Reverse(*delta)))?;
            if score < cfg.min_absolute_matches {
                return None;
            }
            let offset_seconds =
                (best_delta as f32 * cfg.hop_size as f32 / cfg.sample_rate as f32).max(0.0);
            Some(MatchResult {
                track_id,
                score,
                offset_seconds,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score).then(a.track_id.cmp(&b.track_id)));
    results.truncate(cfg.top_n);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;
    use crate::models::{SourceType, TrackMetadata};
    use crate::peaks;
    use crate::spectrogram;

    fn sine_wave(freq: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * duration_secs) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn fingerprint(samples: &[f32], cfg: &Config) -> Vec<FingerprintHash> {
        let spec = spectrogram::compute(samples, cfg.sample_rate, cfg).unwrap();
        let pks = peaks::find_peaks(&spec, cfg);
        hash::generate_hashes(&pks, cfg)
    }

    #[test]
    fn empty_query_returns_empty() {
        let store = fixture_with_db();
        let cfg = Config::default();
        assert!(match_query(&store, &[], &cfg).unwrap().is_empty());
    }

    #[test]
    fn empty_index_returns_empty() {
        let store = fixture_with_db();
        let cfg = Config::default();
        let query = vec![FingerprintHash {
            value: 1,
            anchor_time_idx: 0,
        }];
        assert!(match_query(&store, &query, &cfg).unwrap().is_empty());
    }

    #[test]
    fn self_match_ranks_first_with_high_score() {
        let store = fixture_with_db();
        let cfg = Config::default();
        let samples = sine_wave(440.0, cfg.sample_rate, 5.0);
        let fp = fingerprint(&samples, &cfg);
        assert!(!fp.is_empty());

        let metadata = TrackMetadata {
            title: "Self".into(),
            artist: "".into(),
            album: "".into(),
            source_type: SourceType::Local,
            source_id: "self".into(),
            duration_ms: None,
            cover_url: None,
            release_date: None,
            spotify_url: None,
            youtube_id: None,
        };
        let track_id = store.upsert_track(&metadata).unwrap();
        store.insert_postings(track_id, &fp).unwrap();

        let distinct_hashes: std::collections::HashSet<u32> = fp.iter().map(|h| h.value).collect();

        let results = match_query(&store, &fp, &cfg).unwrap();
        assert_eq!(results[0].track_id, track_id);
        assert!(results[0].score as f32 >= 0.95 * distinct_hashes.len() as f32);
        assert!(results[0].offset_seconds.abs() < 0.01);
    }

    #[test]
    fn white_noise_against_a_populated_index_does_not_false_positive() {
        use rand::Rng;

        let store = fixture_with_db();
        let cfg = Config::default();
        let reference = sine_wave(440.0, cfg.sample_rate, 5.0);
        let fp = fingerprint(&reference, &cfg);
        assert!(!fp.is_empty());

        let metadata = TrackMetadata {
            title: "Reference".into(),
            artist: "".into(),
            album: "".into(),
            source_type: SourceType::Local,
            source_id: "reference".into(),
            duration_ms: None,
            cover_url: None,
            release_date: None,
            spotify_url: None,
            youtube_id: None,
        };
        let track_id = store.upsert_track(&metadata).unwrap();
        store.insert_postings(track_id, &fp).unwrap();

        let mut rng = rand::rng();
        let n = (cfg.sample_rate as f32 * 5.0) as usize;
        let noise: Vec<f32> = (0..n).map(|_| rng.random_range(-1.0f32..1.0)).collect();
        let query = fingerprint(&noise, &cfg);

        let results = match_query(&store, &query, &cfg).unwrap();
        assert!(results.iter().all(|r| r.score < cfg.min_absolute_matches.max(1) * 2));
    }

    fn fixture_with_db() -> IndexStore {
        let path = tempfile::NamedTempFile::new().unwrap().into_temp_path();
        let url = path.to_str().unwrap().to_string();
        std::mem::forget(path);
        let store = IndexStore::new(&url).unwrap();
        store.apply_migrations_for_test();
        store
    }
}
