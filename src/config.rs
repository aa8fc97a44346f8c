use std::env;

/// Tunable parameters for the fingerprinting, matching and ingestion
/// pipeline. Defaults mirror the reference implementation so that
/// fingerprints generated by one deployment remain comparable to another
/// running with the same `Config`.
///
/// Every ingested track and every query must be processed with the *same*
/// `sample_rate`/`window_size`/`hop_size`, or matches become impossible —
/// see spec section 6.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub sample_rate: u32,
    pub window_size: usize,
    pub hop_size: usize,
    pub top_db: f32,

    pub peak_neighborhood_size: usize,
    pub min_amplitude_db: f32,

    pub fan_value: usize,
    pub target_zone_t_start: u32,
    pub target_zone_t_len: u32,
    /// Optional frequency-distance bound on pairing, off by default. The
    /// reference implementation does not enforce this; spec.md marks it as
    /// an optional tuning knob.
    pub target_zone_f_len: Option<u32>,

    pub min_absolute_matches: usize,
    pub top_n: usize,

    pub worker_count: usize,
    pub task_retention_days: i64,

    pub database_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 11025,
            window_size: 4096,
            hop_size: 1024,
            top_db: 80.0,

            peak_neighborhood_size: 20,
            min_amplitude_db: -70.0,

            fan_value: 15,
            target_zone_t_start: 1,
            target_zone_t_len: 100,
            target_zone_f_len: None,

            min_absolute_matches: 2,
            top_n: 5,

            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            task_retention_days: 7,

            database_url: "wavemark.sqlite".to_string(),
        }
    }
}

impl Config {
    /// Loads overrides from the process environment (and `.env`, via
    /// `dotenvy`), falling back to [`Config::default`] for anything unset.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            sample_rate: env_parse("WAVEMARK_SAMPLE_RATE", defaults.sample_rate),
            window_size: env_parse("WAVEMARK_WINDOW_SIZE", defaults.window_size),
            hop_size: env_parse("WAVEMARK_HOP_SIZE", defaults.hop_size),
            top_db: env_parse("WAVEMARK_TOP_DB", defaults.top_db),

            peak_neighborhood_size: env_parse(
                "WAVEMARK_PEAK_NEIGHBORHOOD_SIZE",
                defaults.peak_neighborhood_size,
            ),
            min_amplitude_db: env_parse("WAVEMARK_MIN_AMPLITUDE_DB", defaults.min_amplitude_db),

            fan_value: env_parse("WAVEMARK_FAN_VALUE", defaults.fan_value),
            target_zone_t_start: env_parse(
                "WAVEMARK_TARGET_ZONE_T_START",
                defaults.target_zone_t_start,
            ),
            target_zone_t_len: env_parse("WAVEMARK_TARGET_ZONE_T_LEN", defaults.target_zone_t_len),
            target_zone_f_len: env::var("WAVEMARK_TARGET_ZONE_F_LEN")
                .ok()
                .and_then(|v| v.parse().ok()),

            min_absolute_matches: env_parse(
                "WAVEMARK_MIN_ABSOLUTE_MATCHES",
                defaults.min_absolute_matches,
            ),
            top_n: env_parse("WAVEMARK_TOP_N", defaults.top_n),

            worker_count: env_parse("WAVEMARK_WORKER_COUNT", defaults.worker_count),
            task_retention_days: env_parse(
                "WAVEMARK_TASK_RETENTION_DAYS",
                defaults.task_retention_days,
            ),

            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
        }
    }

    /// Number of STFT frequency bins: `window_size / 2 + 1`.
    pub fn n_freqs(&self) -> usize {
        self.window_size / 2 + 1
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_implementation() {
        let c = Config::default();
        assert_eq!(c.sample_rate, 11025);
        assert_eq!(c.window_size, 4096);
        assert_eq!(c.hop_size, 1024);
        assert_eq!(c.n_freqs(), 2049);
        assert_eq!(c.fan_value, 15);
        assert_eq!(c.min_absolute_matches, 2);
    }
}
