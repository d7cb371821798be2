use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::info;

pub const DEFAULT_DB_PATH: &str = "sparkify.db";
pub const DEFAULT_SONG_DATA: &str = "data/song_data";
pub const DEFAULT_LOG_DATA: &str = "data/log_data";
pub const DEFAULT_EXTENSION: &str = "json";

/// Fully resolved run settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub extension: String,
    pub duration_tolerance: f64,
}

/// Values that may each come from the command line or the env file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub song_data: Option<PathBuf>,
    pub log_data: Option<PathBuf>,
    pub extension: Option<String>,
    pub duration_tolerance: Option<f64>,
}

impl Overrides {
    /// Fills every unset field from `fallback`.
    fn or(self, fallback: Overrides) -> Overrides {
        Overrides {
            db_path: self.db_path.or(fallback.db_path),
            song_data: self.song_data.or(fallback.song_data),
            log_data: self.log_data.or(fallback.log_data),
            extension: self.extension.or(fallback.extension),
            duration_tolerance: self.duration_tolerance.or(fallback.duration_tolerance),
        }
    }
}

/// Resolves settings with precedence: command line, then `env_path`, then
/// built-in defaults. A missing env file is not an error.
pub fn resolve(cli: Overrides, env_path: &Path) -> Result<Settings> {
    let from_file = if env_path.exists() {
        let values = load_from_env(env_path)
            .with_context(|| format!("Failed to read {:?}", env_path))?;
        info!("Loaded settings from {:?}", env_path);
        values
    } else {
        Overrides::default()
    };

    let merged = cli.or(from_file);
    let settings = Settings {
        db_path: merged.db_path.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
        song_data: merged.song_data.unwrap_or_else(|| PathBuf::from(DEFAULT_SONG_DATA)),
        log_data: merged.log_data.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DATA)),
        extension: merged.extension.unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        duration_tolerance: merged.duration_tolerance.unwrap_or(0.0),
    };

    if !(settings.duration_tolerance >= 0.0 && settings.duration_tolerance.is_finite()) {
        return Err(anyhow!(
            "duration tolerance must be a non-negative number, got {}",
            settings.duration_tolerance
        ));
    }
    Ok(settings)
}

fn load_from_env(path: &Path) -> Result<Overrides> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut values = Overrides::default();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key.trim() {
                "ETL_DB_PATH" => values.db_path = Some(PathBuf::from(value)),
                "ETL_SONG_DATA" => values.song_data = Some(PathBuf::from(value)),
                "ETL_LOG_DATA" => values.log_data = Some(PathBuf::from(value)),
                "ETL_EXTENSION" => values.extension = Some(value.to_string()),
                "ETL_DURATION_TOLERANCE" => {
                    let tolerance = value
                        .parse::<f64>()
                        .with_context(|| format!("Invalid ETL_DURATION_TOLERANCE '{}'", value))?;
                    values.duration_tolerance = Some(tolerance);
                }
                _ => {}
            }
        }
    }

    Ok(values)
}
