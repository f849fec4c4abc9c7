use crate::error::CoreError;
use crate::model::DateBasis;
use crate::query::DEFAULT_PAGE_SIZE;
use crate::registry::DEFAULT_ROSTER;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_ENV: &str = "FAT_CONFIG";

/// Administrators when the config file names none.
pub const DEFAULT_ADMIN_EMAILS: [&str; 3] = [
    "rossyneide@maida.health",
    "jennifer.batista@maida.health",
    "lucas@maida.health",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,
    /// Preferred output mode: `pretty`, `text` or `json`.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Http,
}

impl std::str::FromStr for StoreBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "local" => Ok(Self::Sqlite),
            "http" | "api" => Ok(Self::Http),
            other => Err(CoreError::InvalidConfiguration(format!(
                "unknown store backend '{other}' (expected sqlite or http)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            api_base_url: None,
            sqlite_path: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub date_basis: DateBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Administrators, compared case-insensitively.
    #[serde(default = "default_admin_emails")]
    pub admin_emails: Vec<String>,
    #[serde(default = "default_email_suffixes")]
    pub allowed_email_suffixes: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            admin_emails: default_admin_emails(),
            allowed_email_suffixes: default_email_suffixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorsConfig {
    #[serde(default = "default_roster")]
    pub roster: Vec<String>,
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            roster: default_roster(),
        }
    }
}

impl AppConfig {
    /// Overlay `FAT_API_BASE_URL`, `FAT_STORE` and `FAT_SQLITE_PATH`.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] for an unknown `FAT_STORE`.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<(), CoreError> {
        if let Some(url) = lookup("FAT_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.store.api_base_url = Some(url);
        }
        if let Some(backend) = lookup("FAT_STORE").filter(|v| !v.trim().is_empty()) {
            self.store.backend = backend.parse()?;
        }
        if let Some(path) = lookup("FAT_SQLITE_PATH").filter(|v| !v.trim().is_empty()) {
            self.store.sqlite_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`CoreError::InvalidConfiguration`] for values no component accepts.
    pub fn validate(&self) -> std::result::Result<(), CoreError> {
        if self.listing.page_size == 0 {
            return Err(CoreError::InvalidConfiguration(
                "listing.page_size must be at least 1".into(),
            ));
        }
        if self.access.allowed_email_suffixes.is_empty() {
            return Err(CoreError::InvalidConfiguration(
                "access.allowed_email_suffixes must name at least one suffix".into(),
            ));
        }
        Ok(())
    }

    /// Base URL of the record service.
    ///
    /// # Errors
    ///
    /// [`CoreError::Configuration`] when no URL is configured.
    pub fn api_base_url(&self) -> std::result::Result<&str, CoreError> {
        self.store
            .api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                CoreError::Configuration(
                    "store.backend is 'http' but store.api_base_url is not set".into(),
                )
            })
    }

    /// Configured SQLite file, else `<data dir>/faturamento/records.db`.
    #[must_use]
    pub fn sqlite_path(&self) -> PathBuf {
        self.store.sqlite_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("faturamento/records.db")
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.store.timeout_ms)
    }

    #[must_use]
    pub const fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.listing.search_debounce_ms)
    }
}

/// `explicit`, else `$FAT_CONFIG`, else `<config dir>/faturamento/config.toml`.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("faturamento/config.toml"))
}

/// Read a config file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<AppConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve, read, overlay the environment and validate.
///
/// # Errors
///
/// Returns an error for an unreadable or invalid config.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut config = match config_path(explicit) {
        Some(path) => load_config_file(&path)?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Pick the output mode: `--json`, then `FAT_FORMAT`, then the config,
/// then `pretty` on a terminal and `text` otherwise.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    config_output: Option<&str>,
    env_format: Option<&str>,
) -> &'static str {
    fn normalize(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json";
    }
    env_format
        .and_then(normalize)
        .or_else(|| config_output.and_then(normalize))
        .unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                "pretty"
            } else {
                "text"
            }
        })
}

const fn default_timeout_ms() -> u64 {
    15_000
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_search_debounce_ms() -> u64 {
    500
}

fn default_admin_emails() -> Vec<String> {
    DEFAULT_ADMIN_EMAILS.iter().map(ToString::to_string).collect()
}

fn default_email_suffixes() -> Vec<String> {
    vec!["@maida.health".to_string(), "@gmail.com".to_string()]
}

fn default_roster() -> Vec<String> {
    DEFAULT_ROSTER.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_config_file(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.listing.page_size, 20);
        assert_eq!(cfg.search_debounce(), Duration::from_millis(500));
        assert_eq!(cfg.dashboard.date_basis, DateBasis::Updated);
        assert_eq!(cfg.access.admin_emails, DEFAULT_ADMIN_EMAILS.to_vec());
        assert_eq!(cfg.access.allowed_email_suffixes.len(), 2);
        assert_eq!(cfg.collaborators.roster.len(), DEFAULT_ROSTER.len());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[store]
backend = "http"
api_base_url = "http://localhost:5000/api"

[access]
admin_emails = ["Chefe@maida.health"]

[dashboard]
date_basis = "received"
"#,
        )
        .expect("write config");

        let cfg = load_config_file(&path).expect("load");
        assert_eq!(cfg.store.backend, StoreBackend::Http);
        assert_eq!(cfg.api_base_url().expect("url"), "http://localhost:5000/api");
        assert_eq!(cfg.store.timeout_ms, 15_000);
        assert_eq!(cfg.access.admin_emails, vec!["Chefe@maida.health"]);
        assert_eq!(cfg.access.allowed_email_suffixes.len(), 2);
        assert_eq!(cfg.dashboard.date_basis, DateBasis::Received);
        assert_eq!(cfg.listing.page_size, 20);
    }

    #[test]
    fn empty_admin_list_in_file_disables_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[access]\nadmin_emails = []\n").expect("write config");
        let cfg = load_config_file(&path).expect("load");
        assert!(cfg.access.admin_emails.is_empty());

        std::fs::write(&path, "[access]\nallowed_email_suffixes = [\"@maida.health\"]\n")
            .expect("write config");
        let cfg = load_config_file(&path).expect("load");
        assert_eq!(cfg.access.admin_emails.len(), DEFAULT_ADMIN_EMAILS.len());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let env: HashMap<&str, &str> = [
            ("FAT_API_BASE_URL", "http://api.internal"),
            ("FAT_STORE", "HTTP"),
            ("FAT_SQLITE_PATH", "/tmp/x.db"),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfig::default();
        cfg.apply_env_overrides(|k| env.get(k).map(ToString::to_string))
            .expect("overrides");
        assert_eq!(cfg.store.backend, StoreBackend::Http);
        assert_eq!(cfg.api_base_url().expect("url"), "http://api.internal");
        assert_eq!(cfg.sqlite_path(), PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn unknown_backend_is_invalid() {
        let mut cfg = AppConfig::default();
        let err = cfg
            .apply_env_overrides(|k| (k == "FAT_STORE").then(|| "postgres".to_string()))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
    }

    #[test]
    fn missing_api_url_is_configuration_error() {
        let cfg = AppConfig::default();
        assert!(matches!(cfg.api_base_url(), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn zero_page_size_fails_validation() {
        let mut cfg = AppConfig::default();
        cfg.listing.page_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
        assert_eq!(resolve_output(false, Some("pretty"), Some("plain")), "text");
        assert_eq!(resolve_output(false, Some("human"), None), "pretty");
    }
}
