use crate::error::Error;
use crate::size;
use config::{Config, Environment, File as ConfigFile, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const HOME_ENV: &str = "FETCHBACK_HOME";
pub const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_THRESHOLD: &str = "100MB";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub downloads_directory: String,
    pub database_file: String,
    pub default_size_threshold: String,
    pub write_redirect_placeholders: bool,
    pub use_ledger: bool,
    pub probe_timeout_secs: u64,
    pub ignore_patterns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            downloads_directory: "~/Downloads".to_string(),
            database_file: "files.db".to_string(),
            default_size_threshold: DEFAULT_THRESHOLD.to_string(),
            write_redirect_placeholders: false,
            use_ledger: true,
            probe_timeout_secs: 10,
            ignore_patterns: vec![
                "*.crdownload".to_string(),
                "*.part".to_string(),
                "*.download".to_string(),
            ],
        }
    }
}

impl AppConfig {
    pub fn downloads_path(&self) -> PathBuf {
        expand_tilde(&self.downloads_directory)
    }

    /// Relative database paths live under the application home.
    pub fn database_path(&self, home: &Path) -> PathBuf {
        let path = expand_tilde(&self.database_file);
        if path.is_absolute() || self.database_file == ":memory:" {
            path
        } else {
            home.join(path)
        }
    }

    pub fn threshold_bytes(&self) -> u64 {
        match size::parse_size(&self.default_size_threshold) {
            Ok(bytes) => bytes,
            Err(_) => {
                warn!(
                    "Unrecognized size format '{}' in configuration, using {}",
                    self.default_size_threshold, DEFAULT_THRESHOLD
                );
                size::parse_size(DEFAULT_THRESHOLD).unwrap_or(100 * 1024 * 1024)
            }
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    /// The commented configuration file written on first run.
    pub fn render_default() -> String {
        let body = toml::to_string_pretty(&AppConfig::default()).unwrap_or_default();
        format!(
            "# fetchback configuration\n\
             #\n\
             # downloads_directory          directory scanned for large files\n\
             # database_file                SQLite ledger, relative to ${}\n\
             # default_size_threshold       e.g. 100MB, 1.5GB, 500KB or raw bytes\n\
             # write_redirect_placeholders  leave a .webloc next to each deleted file\n\
             # use_ledger                   record deletions in the database\n\
             # probe_timeout_secs           connect/read timeout for URL checks\n\
             # ignore_patterns              globs of files never considered\n\n{}",
            HOME_ENV, body
        )
    }
}

/// `$FETCHBACK_HOME`, or `~/.config/fetchback`.
pub fn app_home() -> PathBuf {
    match env::var(HOME_ENV) {
        Ok(home) if !home.trim().is_empty() => expand_tilde(&home),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("fetchback"),
    }
}

pub fn load_configuration() -> Result<AppConfig, Error> {
    load_from(&app_home().join(CONFIG_FILE_NAME))
}

/// Load configuration from `path`, materializing the default file when it is missing.
/// `FETCHBACK_*` environment variables override file values.
pub fn load_from(path: &Path) -> Result<AppConfig, Error> {
    ensure_config_file(path)?;

    let defaults = AppConfig::default();
    let builder = Config::builder()
        .set_default("downloads_directory", defaults.downloads_directory)?
        .set_default("database_file", defaults.database_file)?
        .set_default("default_size_threshold", defaults.default_size_threshold)?
        .set_default("write_redirect_placeholders", defaults.write_redirect_placeholders)?
        .set_default("use_ledger", defaults.use_ledger)?
        .set_default("probe_timeout_secs", defaults.probe_timeout_secs as i64)?
        .set_default("ignore_patterns", defaults.ignore_patterns)?
        .add_source(
            ConfigFile::from(path)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix("FETCHBACK")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;

    let config = builder.try_deserialize::<AppConfig>()?;
    debug!("Loaded configuration from {}: {:?}", path.display(), config);
    Ok(config)
}

fn ensure_config_file(path: &Path) -> Result<(), Error> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, AppConfig::render_default())?;
    info!("Wrote default configuration to {}", path.display());
    Ok(())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
