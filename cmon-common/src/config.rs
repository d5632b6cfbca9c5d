//! Configuration loading and path resolution
//!
//! Paths resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! The heuristic constants of the import pipeline (header scan depth, score saturation,
//! color thresholds) live here as well so they can be tuned without a rebuild.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "CMON_DATABASE";

/// Environment variable overriding the workbook path
pub const ENV_WORKBOOK: &str = "CMON_WORKBOOK";

/// Main data sheet of the condition matrix workbook
pub const DEFAULT_MAIN_SHEET: &str = "CM Matrix equipos principales";

/// Rules sheet holding keyword weights
pub const DEFAULT_CRITERIA_SHEET: &str = "Criterios";

/// Workbook file name looked up in the working directory when nothing else is configured
pub const DEFAULT_WORKBOOK_FILE: &str = "Matriz de condición de equipos principales excel.xlsx";

/// Leading rows searched for the header row
pub const DEFAULT_HEADER_MAX_SCAN: usize = 10;

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";

/// Contents of `config.toml`
///
/// Every section is optional; missing keys take the compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub workbook_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub logging: LoggingConfig,
    pub workbook: WorkbookConfig,
    pub scoring: ScoringConfig,
    pub color: ColorThresholds,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[workbook]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    pub main_sheet: String,
    pub criteria_sheet: String,
    /// Number of leading rows searched for the header row
    pub header_max_scan: usize,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            main_sheet: DEFAULT_MAIN_SHEET.to_string(),
            criteria_sheet: DEFAULT_CRITERIA_SHEET.to_string(),
            header_max_scan: DEFAULT_HEADER_MAX_SCAN,
        }
    }
}

/// `[scoring]` section
///
/// `saturation_matches` is the number of maximum-weight keyword hits that saturate the
/// 0-10 criticality scale. The value 3 is calibrated against one workbook and has no
/// derivation; it needs domain review before being changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub saturation_matches: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            saturation_matches: 3.0,
        }
    }
}

/// `[color]` section: RGB thresholds for fill classification
///
/// Calibrated to the visual conventions of one workbook; flagged for domain review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorThresholds {
    /// Red channel must exceed this for red and yellow
    pub strong_red: u8,
    /// Green and blue must stay below this for red
    pub red_max_other: u8,
    /// Green must exceed this for yellow
    pub yellow_min_green: u8,
    /// Blue must stay below this for yellow
    pub yellow_max_blue: u8,
    /// Dominant channel must exceed this for blue and green
    pub dominant_min: u8,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            strong_red: 200,
            red_max_other: 120,
            yellow_min_green: 150,
            yellow_max_blue: 150,
            dominant_min: 140,
        }
    }
}

impl TomlConfig {
    /// Load configuration from `path`, or from the platform config file when `None`
    ///
    /// A missing file is not an error: a warning is logged and defaults are returned.
    /// A file that exists but does not parse is reported as [`Error::ConfigParse`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: TomlConfig = toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.clone(),
            source,
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values that would break the pipeline arithmetic
    pub fn validate(&self) -> Result<()> {
        if self.workbook.header_max_scan == 0 {
            return Err(Error::Config(
                "workbook.header_max_scan must be at least 1".to_string(),
            ));
        }
        if !(self.scoring.saturation_matches > 0.0) {
            return Err(Error::Config(format!(
                "scoring.saturation_matches must be positive, got {}",
                self.scoring.saturation_matches
            )));
        }
        Ok(())
    }

    /// Database path: CLI → `CMON_DATABASE` → TOML → platform default
    pub fn resolve_database_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_path(
            cli_arg,
            ENV_DATABASE,
            self.database_path.as_deref(),
            default_database_path,
        )
    }

    /// Workbook path: CLI → `CMON_WORKBOOK` → TOML → working directory default
    pub fn resolve_workbook_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_path(
            cli_arg,
            ENV_WORKBOOK,
            self.workbook_path.as_deref(),
            || PathBuf::from(DEFAULT_WORKBOOK_FILE),
        )
    }

    /// HTTP bind address: CLI → TOML → default
    pub fn resolve_bind_address(&self, cli_arg: Option<&str>) -> String {
        cli_arg
            .map(str::to_string)
            .or_else(|| self.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }
}

/// Generic four-tier path resolution
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: impl FnOnce() -> PathBuf,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: compiled default
    default()
}

/// `~/.config/cmon/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cmon").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cmon").join("machines.db"))
        .unwrap_or_else(|| PathBuf::from("machines.db"))
}
