// Configuration loading and parsing (hoopsrisk.toml).

use hoopsrisk_core::features::RollingWeighting;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// File name looked up under `config/`.
pub const CONFIG_FILE: &str = "hoopsrisk.toml";

/// Accepted range for a configured clock year. The first NBA-era season
/// starts in 1946.
const EARLIEST_YEAR: i32 = 1946;
const LATEST_YEAR: i32 = 2200;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Clock year for draft-distance features. `None` means "use today".
    pub current_year: Option<i32>,
    pub rolling: RollingWeighting,
    pub data_paths: DataPaths,
    /// Player name -> provider player id.
    pub players: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub seasons: String,
}

impl Config {
    /// Resolve a roster name (case-insensitive) to its player id. Anything
    /// not on the roster is taken to be an id already.
    pub fn resolve_player(&self, name_or_id: &str) -> String {
        let wanted = name_or_id.trim();
        self.players
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, id)| id.clone())
            .unwrap_or_else(|| wanted.to_string())
    }

    /// Seasons CSV location. Relative paths are taken from `base_dir`.
    pub fn seasons_path(&self, base_dir: &Path) -> PathBuf {
        let path = Path::new(&self.data_paths.seasons);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// hoopsrisk.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    clock: ClockSection,
    #[serde(default)]
    rolling: RollingSection,
    data_paths: DataPaths,
    #[serde(default)]
    players: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ClockSection {
    current_year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RollingSection {
    #[serde(default)]
    renormalize: bool,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/hoopsrisk.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        current_year: file.clock.current_year,
        rolling: if file.rolling.renormalize {
            RollingWeighting::Renormalized
        } else {
            RollingWeighting::Truncated
        },
        data_paths: file.data_paths,
        players: file.players,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/hoopsrisk.toml` from the shipped copy in `defaults/` when
/// the user has none. Returns the path written, or `None` when a config was
/// already in place. An existing file is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }
    let shipped = base_dir.join("defaults").join(CONFIG_FILE);
    if !shipped.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no {CONFIG_FILE} in {} (looked in config/ and defaults/); \
                 use --config-dir to point at the hoopsrisk install",
                base_dir.display()
            ),
        });
    }

    let seed_error = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("cannot seed {} from {}: {e}", target.display(), shipped.display()),
    };
    std::fs::create_dir_all(base_dir.join("config")).map_err(seed_error)?;
    std::fs::copy(&shipped, &target).map_err(seed_error)?;
    info!("wrote default configuration to {}", target.display());
    Ok(Some(target))
}

/// Seed `base_dir/config` from the shipped defaults if needed, then load it.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if let Some(year) = config.current_year {
        if !(EARLIEST_YEAR..=LATEST_YEAR).contains(&year) {
            return Err(ConfigError::ValidationError {
                field: "clock.current_year".into(),
                message: format!("must be between {EARLIEST_YEAR} and {LATEST_YEAR}, got {year}"),
            });
        }
    }

    if config.data_paths.seasons.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data_paths.seasons".into(),
            message: "must not be empty".into(),
        });
    }

    for (name, id) in &config.players {
        if id.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("players.{name}"),
                message: "player id must not be empty".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
