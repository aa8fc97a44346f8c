use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use wavemark::adapters::LocalFileAdapter;
use wavemark::app::AppContext;
use wavemark::config::Config;
use wavemark::index::IndexStore;
use wavemark::{decoder, hash, ingestion, matcher, peaks, spectrogram};

#[derive(Parser)]
#[command(name = "wavemark-cli", about = "Audio-fingerprint recognition engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a single reference track from a local audio file.
    Ingest { path: PathBuf },
    /// Ingest every file in a directory as a playlist.
    IngestPlaylist { dir: PathBuf },
    /// Recognize a query clip against the index.
    Match {
        path: PathBuf,
        #[arg(long, default_value_t = 10)]
        min_absolute_matches: usize,
    },
    /// List ingested tracks.
    List,
    /// Serve the HTTP/WS façade.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,
    },
    /// Record from the default microphone and match it against the index.
    Listen {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Render a track's constellation map to an SVG heatmap for inspection.
    Visualize {
        path: PathBuf,
        #[arg(long, default_value = "constellation.svg")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "wavemark-cli exited with a system error");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli, config: Config) -> wavemark::Result<ExitCode> {
    let store = IndexStore::new(&config.database_url)?;
    run_pending_migrations(&config.database_url);

    let ctx = AppContext::new(
        config,
        store,
        Arc::new(LocalFileAdapter),
        Arc::new(LocalFileAdapter),
    );

    match cli.command {
        Command::Ingest { path } => {
            let result = ingestion::ingest_track(&ctx, &path.to_string_lossy());
            if result.success {
                info!(track_id = ?result.track_id, status = ?result.status, "ingest complete");
                Ok(ExitCode::SUCCESS)
            } else {
                error!(error = ?result.error, "ingest failed");
                Ok(ExitCode::from(1))
            }
        }
        Command::IngestPlaylist { dir } => {
            let task_id = ingestion::ingest_playlist(&ctx, &dir.to_string_lossy())?;
            let task = ctx.tasks.get(&task_id)?;
            match task.map(|t| t.status) {
                Some(status) if status == "completed" => Ok(ExitCode::SUCCESS),
                _ => Ok(ExitCode::from(1)),
            }
        }
        Command::Match {
            path,
            min_absolute_matches,
        } => {
            let mut cfg = ctx.config.clone();
            cfg.min_absolute_matches = min_absolute_matches;

            let (samples, sr) = decoder::decode_path(&path, cfg.sample_rate)?;
            let spec = spectrogram::compute(&samples, sr, &cfg)?;
            let pks = peaks::find_peaks(&spec, &cfg);
            let query = hash::generate_hashes(&pks, &cfg);
            let results = matcher::match_query(&ctx.store, &query, &cfg)?;

            match results.first() {
                Some(top) => {
                    println!(
                        "match_found=true track_id={} score={} offset_seconds={:.2}",
                        top.track_id, top.score, top.offset_seconds
                    );
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("match_found=false");
                    Ok(ExitCode::from(1))
                }
            }
        }
        Command::List => {
            for track in ctx.store.list_tracks()? {
                println!("{}\t{}\t{}", track.id, track.title, track.artist);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { addr } => {
            let runtime = tokio::runtime::Runtime::new()
                .map_err(|e| wavemark::WaveMarkError::Store(format!("tokio runtime: {e}")))?;
            runtime.block_on(serve(ctx, &addr))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Visualize { path, out } => {
            let (samples, sr) = decoder::decode_path(&path, ctx.config.sample_rate)?;
            let spec = spectrogram::compute(&samples, sr, &ctx.config)?;
            let pks = peaks::find_peaks(&spec, &ctx.config);
            let song_name = path.file_stem().map(|s| s.to_string_lossy().into_owned());
            wavemark::visualization::write_heatmap_svg(
                &spec,
                &pks,
                &out,
                song_name.as_deref().unwrap_or("unknown"),
            )
            .map_err(|e| wavemark::WaveMarkError::Store(format!("writing {}: {e}", out.display())))?;
            info!(out = %out.display(), "wrote constellation heatmap");
            Ok(ExitCode::SUCCESS)
        }
        Command::Listen { seconds } => {
            let samples = wavemark::mic::record(seconds, ctx.config.sample_rate)?;
            let spec = spectrogram::compute(&samples, ctx.config.sample_rate, &ctx.config)?;
            let pks = peaks::find_peaks(&spec, &ctx.config);
            let query = hash::generate_hashes(&pks, &ctx.config);
            let results = matcher::match_query(&ctx.store, &query, &ctx.config)?;

            match results.first() {
                Some(top) => {
                    println!(
                        "match_found=true track_id={} score={} offset_seconds={:.2}",
                        top.track_id, top.score, top.offset_seconds
                    );
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("match_found=false");
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

async fn serve(ctx: AppContext, addr: &str) -> wavemark::Result<()> {
    let app = wavemark::api::router(ctx);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| wavemark::WaveMarkError::Store(format!("bind {addr}: {e}")))?;
    info!(addr, "wavemark-cli serving");
    axum::serve(listener, app)
        .await
        .map_err(|e| wavemark::WaveMarkError::Store(format!("serve: {e}")))
}

fn run_pending_migrations(database_url: &str) {
    if let Err(e) = wavemark::run_pending_migrations(database_url) {
        error!(error = %e, "failed to run pending migrations");
    }
}

