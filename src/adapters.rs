use std::path::{Path, PathBuf};

use crate::error::{Result, WaveMarkError};
use crate::models::{SourceType, TrackMetadata};

/// A fetched track's raw audio plus whatever metadata accompanied it.
#[derive(Debug, Clone)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
}

/// Resolves catalog URLs to track/playlist metadata. Spotify/YouTube
/// implementations are out of scope per spec section 1 — this trait is the
/// seam the ingestion pipeline depends on instead of a concrete client.
pub trait MetadataFetcher: Send + Sync {
    fn get_track(&self, url: &str) -> Result<TrackMetadata>;
    fn get_playlist(&self, url: &str) -> Result<Vec<TrackMetadata>>;
}

/// Resolves a track identifier to a temporary local audio file. The caller
/// owns the returned path and must delete it once done.
pub trait AudioFetcher: Send + Sync {
    fn search_and_download(&self, query: &str) -> Result<(PathBuf, MediaMetadata)>;
}

/// The one concrete, in-scope adapter: treats `source_url` as a local
/// filesystem path. Covers `source_type ∈ {file, local}`; satisfies both
/// traits so the ingestion pipeline is exercisable without any network
/// dependency.
pub struct LocalFileAdapter;

impl MetadataFetcher for LocalFileAdapter {
    fn get_track(&self, url: &str) -> Result<TrackMetadata> {
        let path = Path::new(url);
        if !path.exists() {
            return Err(WaveMarkError::Adapter(format!("no such file: {url}")));
        }
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());

        Ok(TrackMetadata {
            title,
            artist: String::new(),
            album: String::new(),
            source_type: SourceType::Local,
            source_id: url.to_string(),
            duration_ms: None,
            cover_url: None,
            release_date: None,
            spotify_url: None,
            youtube_id: None,
        })
    }

    fn get_playlist(&self, url: &str) -> Result<Vec<TrackMetadata>> {
        let dir = Path::new(url);
        if !dir.is_dir() {
            return Err(WaveMarkError::Adapter(format!(
                "playlist source must be a directory: {url}"
            )));
        }

        let mut tracks = Vec::new();
        for entry in std::fs::read_dir(dir)
            .map_err(|e| WaveMarkError::Adapter(format!("reading playlist dir {url}: {e}")))?
        {
            let Ok(entry) = entry else { continue };
            let path = entry.path();
            if path.is_file() {
                if let Ok(metadata) = self.get_track(&path.to_string_lossy()) {
                    tracks.push(metadata);
                }
            }
        }
        Ok(tracks)
    }
}

impl AudioFetcher for LocalFileAdapter {
    /// Copies `query` into a fresh temp file rather than handing back the
    /// caller's own path: the ingestion pipeline deletes whatever path it
    /// receives once it's done decoding, and a real fetcher's "download"
    /// is always a temp file it's fine to remove.
    fn search_and_download(&self, query: &str) -> Result<(PathBuf, MediaMetadata)> {
        let path = Path::new(query);
        if !path.exists() {
            return Err(WaveMarkError::Adapter(format!("no such file: {query}")));
        }
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| query.to_string());

        let mut dest = std::env::temp_dir();
        let unique = format!(
            "wavemark-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        );
        dest.push(unique);
        std::fs::copy(path, &dest)
            .map_err(|e| WaveMarkError::Adapter(format!("staging {query}: {e}")))?;

        Ok((
            dest,
            MediaMetadata {
                title,
                artist: String::new(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_track_on_missing_path_is_adapter_error() {
        let adapter = LocalFileAdapter;
        let result = adapter.get_track("/nonexistent/file.wav");
        assert!(matches!(result, Err(WaveMarkError::Adapter(_))));
    }

    #[test]
    fn search_and_download_does_not_consume_the_source_file() {
        let adapter = LocalFileAdapter;
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wav");
        std::fs::write(&source, b"RIFF....").unwrap();

        let (downloaded, _) = adapter
            .search_and_download(source.to_str().unwrap())
            .unwrap();

        assert_ne!(downloaded, source);
        assert!(source.exists());
        assert!(downloaded.exists());
        let _ = std::fs::remove_file(downloaded);
    }

    #[test]
    fn get_playlist_skips_non_files() {
        let adapter = LocalFileAdapter;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.wav"), b"RIFF....").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        let tracks = adapter.get_playlist(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(tracks.len(), 1);
    }
}
