//! YAML configuration with environment overrides. Every section has defaults
//! so the application starts with an empty file; only the spreadsheet address
//! and credentials have to be supplied for the Google backend.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::models::{Columns, StatusLabels};
use crate::store::ServiceAccountKey;

/// Spreadsheet URL or id, overriding `sheet.spreadsheet`.
pub const SPREADSHEET_ENV: &str = "MATERIAUTHEQUE_SPREADSHEET";
/// Inline service-account JSON, overriding `sheet.credentials`.
pub const SERVICE_ACCOUNT_ENV: &str = "MATERIAUTHEQUE_SERVICE_ACCOUNT";

const DATA_DIR_NAME: &str = ".materiautheque";
const DB_FILE_NAME: &str = "ledger.sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    GoogleSheets,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub backend: Backend,
    pub sheet: SheetConfig,
    pub local: LocalConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub columns: Columns,
    pub labels: StatusLabels,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet: Option<String>,
    pub worksheet: String,
    /// Path to the service-account JSON key.
    pub credentials: Option<PathBuf>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet: None,
            worksheet: "Feuille1".to_string(),
            credentials: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            backend: Backend::GoogleSheets,
            sheet: SheetConfig::default(),
            local: LocalConfig::default(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            columns: Columns::default(),
            labels: StatusLabels::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment
    /// overrides.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");
        let mut candidates = Vec::new();
        if let Some(dirs) = ProjectDirs::from("", "", project_name) {
            candidates.push(dirs.config_dir().join(format!("{project_name}.yml")));
        }
        candidates.push(PathBuf::from(format!("{project_name}.yml")));

        Ok(Self::load_first(&candidates)?.unwrap_or_default())
    }

    /// Load the first candidate that exists. A file that exists but does not
    /// parse is an error rather than a silent fallback to defaults.
    fn load_first(candidates: &[PathBuf]) -> Result<Option<Self>> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
                .map(Some),
            None => Ok(None),
        }
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    fn apply_env(&mut self) {
        if let Ok(spreadsheet) = env::var(SPREADSHEET_ENV) {
            if !spreadsheet.trim().is_empty() {
                self.sheet.spreadsheet = Some(spreadsheet);
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Service-account key from the environment, else from the configured file.
    pub fn service_account(&self) -> Result<ServiceAccountKey> {
        if let Ok(raw) = env::var(SERVICE_ACCOUNT_ENV) {
            return ServiceAccountKey::from_json(&raw)
                .with_context(|| format!("{SERVICE_ACCOUNT_ENV} is not a valid service-account key"));
        }

        let path = self.sheet.credentials.as_ref().ok_or_else(|| {
            anyhow!("no credentials configured (set sheet.credentials or {SERVICE_ACCOUNT_ENV})")
        })?;
        let path = expand_home(path)?;
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        ServiceAccountKey::from_json(&raw)
            .with_context(|| format!("{} is not a valid service-account key", path.display()))
    }

    /// SQLite file for the local backend, defaulting to the user's home.
    pub fn local_db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.local.path {
            return expand_home(path);
        }
        let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
        Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
    }
}

/// Replace a leading `~` component with the user's home directory.
fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let base_dirs =
                BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
            Ok(base_dirs.home_dir().join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::GoogleSheets);
        assert_eq!(config.sheet.worksheet, "Feuille1");
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert_eq!(config.columns, Columns::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "backend: local\ncache:\n  ttl_secs: 10\nlabels:\n  free: Free\n",
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(config.cache.ttl_secs, 10);
        assert_eq!(config.labels.free, "Free");
        assert_eq!(config.labels.on_loan, "Emprunté");
        assert_eq!(config.sheet.worksheet, "Feuille1");
    }

    #[test]
    fn test_full_sheet_section() {
        let config = Config::from_yaml(
            r#"
sheet:
  spreadsheet: https://docs.google.com/spreadsheets/d/abc/edit
  worksheet: Outils
  credentials: /etc/materiautheque/key.json
columns:
  name: Tool
  status: State
  borrower: Who
"#,
        )
        .unwrap();
        assert_eq!(config.sheet.worksheet, "Outils");
        assert_eq!(
            config.sheet.credentials,
            Some(PathBuf::from("/etc/materiautheque/key.json"))
        );
        assert_eq!(config.columns.header_row(), vec!["Tool", "State", "Who"]);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(Config::from_yaml("backend: [nope").is_err());
        assert!(Config::from_yaml("backend: spreadsheet-of-doom").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materiautheque.yml");
        fs::write(&path, "backend: local\nlocal:\n  path: /tmp/ledger.sqlite\n").unwrap();

        let config = Config::load_file(Some(&path)).unwrap();
        assert_eq!(config.backend, Backend::Local);
        assert_eq!(
            config.local_db_path().unwrap(),
            PathBuf::from("/tmp/ledger.sqlite")
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = PathBuf::from("/definitely/not/here.yml");
        assert!(Config::load_file(Some(&path)).is_err());
    }

    #[test]
    fn test_credentials_file_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        fs::write(&path, "{}").unwrap();

        let mut config = Config::default();
        config.sheet.credentials = Some(path);
        if env::var(SERVICE_ACCOUNT_ENV).is_err() {
            assert!(config.service_account().is_err());
        }
    }

    #[test]
    fn test_home_relative_local_path_is_expanded() {
        let config =
            Config::from_yaml("backend: local\nlocal:\n  path: ~/.materiautheque/ledger.sqlite\n")
                .unwrap();

        let path = config.local_db_path().unwrap();
        assert!(path.is_absolute());
        assert!(!path.starts_with("~"));
        assert!(path.ends_with(".materiautheque/ledger.sqlite"));
    }

    #[test]
    fn test_expand_home_leaves_other_paths_alone() {
        assert_eq!(
            expand_home(Path::new("/etc/key.json")).unwrap(),
            PathBuf::from("/etc/key.json")
        );
        assert_eq!(
            expand_home(Path::new("~user/key.json")).unwrap(),
            PathBuf::from("~user/key.json")
        );
        assert!(expand_home(Path::new("~/key.json")).unwrap().is_absolute());
    }

    #[test]
    fn test_malformed_config_in_chain_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        let broken = dir.path().join("broken.yml");
        let good = dir.path().join("good.yml");
        fs::write(&broken, "backend: [nope").unwrap();
        fs::write(&good, "backend: local\n").unwrap();

        let err = Config::load_first(&[missing.clone(), broken.clone(), good.clone()]).unwrap_err();
        assert!(format!("{err:#}").contains("broken.yml"));

        let config = Config::load_first(&[missing.clone(), good]).unwrap().unwrap();
        assert_eq!(config.backend, Backend::Local);
        assert!(Config::load_first(&[missing]).unwrap().is_none());
    }
}
