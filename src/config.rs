//! Configuration for terralog paths.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (TERRALOG_LOG_PATH, TERRALOG_DATA_DIR)
//! 2. Config file (.terralog/config.yaml)
//! 3. Defaults relative to the working directory
//!
//! Config file discovery:
//! - Searches current directory and parents for .terralog/config.yaml
//! - Paths in the config file are relative to the config file's parent
//!   directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ledger::{DEFAULT_LOG_PATH, LOG_PATH_ENV};

/// Environment override for the data directory
pub const DATA_DIR_ENV: &str = "TERRALOG_DATA_DIR";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub search: Option<SearchConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Evidence ledger file (relative to config file)
    pub log: Option<String>,
    /// Pipeline data directory (relative to config file)
    pub data: Option<String>,
    /// Figure directory (relative to config file)
    pub figures: Option<String>,
    /// Report output directory (relative to config file)
    pub reports: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub data_center: Option<String>,
    pub pad_deg: Option<f64>,
    pub max_granules: Option<usize>,
}

/// Resolved configuration with final paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Evidence ledger path
    pub log_path: PathBuf,
    /// Pipeline data directory (exports, candidates, granules)
    pub data_dir: PathBuf,
    /// Rendered figure directory
    pub figures_dir: PathBuf,
    /// Report output directory
    pub reports_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Granule search settings
    pub search: SearchSettings,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Named data center tried after provider auto-routing
    pub data_center: String,
    /// AOI padding for the final search retry, degrees
    pub pad_deg: f64,
    /// Download cap per extract run
    pub max_granules: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            data_center: "ORNL_DAAC".to_string(),
            pad_deg: 0.5,
            max_granules: 6,
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".terralog").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path_str)
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let (mut log_path, mut data_dir, figures_dir, reports_dir, search) =
        if let Some(ref config_path) = config_file {
            let config = load_config_file(config_path)?;

            // Base directory is the parent of .terralog/
            let base_dir = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."));

            let log_path = config
                .paths
                .log
                .as_deref()
                .map(|p| resolve_path(base_dir, p))
                .unwrap_or_else(|| base_dir.join(DEFAULT_LOG_PATH));
            let data_dir = config
                .paths
                .data
                .as_deref()
                .map(|p| resolve_path(base_dir, p))
                .unwrap_or_else(|| base_dir.join("data"));
            let figures_dir = config
                .paths
                .figures
                .as_deref()
                .map(|p| resolve_path(base_dir, p))
                .unwrap_or_else(|| base_dir.join("figures"));
            let reports_dir = config
                .paths
                .reports
                .as_deref()
                .map(|p| resolve_path(base_dir, p))
                .unwrap_or_else(|| base_dir.join("reports"));

            let defaults = SearchSettings::default();
            let search = match config.search {
                Some(s) => SearchSettings {
                    data_center: s.data_center.unwrap_or(defaults.data_center),
                    pad_deg: s.pad_deg.unwrap_or(defaults.pad_deg),
                    max_granules: s.max_granules.unwrap_or(defaults.max_granules),
                },
                None => defaults,
            };

            (log_path, data_dir, figures_dir, reports_dir, search)
        } else {
            (
                PathBuf::from(DEFAULT_LOG_PATH),
                PathBuf::from("data"),
                PathBuf::from("figures"),
                PathBuf::from("reports"),
                SearchSettings::default(),
            )
        };

    // Environment overrides win over the config file
    if let Ok(env_log) = std::env::var(LOG_PATH_ENV) {
        if !env_log.is_empty() {
            log_path = PathBuf::from(env_log);
        }
    }
    if let Ok(env_data) = std::env::var(DATA_DIR_ENV) {
        if !env_data.is_empty() {
            data_dir = PathBuf::from(env_data);
        }
    }

    Ok(ResolvedConfig {
        log_path,
        data_dir,
        figures_dir,
        reports_dir,
        config_file,
        search,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the evidence ledger path
pub fn log_path() -> Result<PathBuf> {
    Ok(config()?.log_path.clone())
}

/// Get the pipeline data directory
pub fn data_dir() -> Result<PathBuf> {
    Ok(config()?.data_dir.clone())
}

/// Get the figure directory
pub fn figures_dir() -> Result<PathBuf> {
    Ok(config()?.figures_dir.clone())
}

/// Get the report output directory
pub fn reports_dir() -> Result<PathBuf> {
    Ok(config()?.reports_dir.clone())
}
