use crate::errors::{AppError, AppResult};
use crate::utils::path::expand_tilde;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".fieldsync";
const CONFIG_FILE: &str = "fieldsync.conf";
const DATABASE_FILE: &str = "fieldsync.sqlite";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Static asset used for reachability probes; defaults to
    /// `/favicon.ico` on the API origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_online_settle_ms")]
    pub online_settle_ms: u64,
    #[serde(default = "default_visibility_settle_ms")]
    pub visibility_settle_ms: u64,
    #[serde(default = "default_palm_page_size")]
    pub palm_page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}
fn default_probe_timeout_ms() -> u64 {
    2000
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_batch_size() -> usize {
    50
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_sync_interval_secs() -> u64 {
    30
}
fn default_online_settle_ms() -> u64 {
    500
}
fn default_visibility_settle_ms() -> u64 {
    300
}
fn default_palm_page_size() -> u32 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            api_base_url: default_api_base_url(),
            probe_url: None,
            probe_timeout_ms: default_probe_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            sync_interval_secs: default_sync_interval_secs(),
            online_settle_ms: default_online_settle_ms(),
            visibility_settle_ms: default_visibility_settle_ms(),
            palm_page_size: default_palm_page_size(),
            auth_token: None,
        }
    }
}

impl Config {
    /// `~/.fieldsync`, falling back to the working directory without a home.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn config_file() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE)
    }

    pub fn database_file() -> PathBuf {
        Self::config_dir().join(DATABASE_FILE)
    }

    /// Load the configuration file, or defaults when it does not exist.
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn database_path(&self) -> PathBuf {
        expand_tilde(&self.database)
    }

    /// Probe target: explicit `probe_url`, else `/favicon.ico` on the API origin.
    pub fn probe_url(&self) -> AppResult<Url> {
        let raw = match &self.probe_url {
            Some(url) => url.clone(),
            None => {
                let api = Url::parse(&self.api_base_url).map_err(|e| {
                    AppError::Config(format!("invalid api_base_url '{}': {}", self.api_base_url, e))
                })?;
                return api
                    .join("/favicon.ico")
                    .map_err(|e| AppError::Config(e.to_string()));
            }
        };
        Url::parse(&raw).map_err(|e| AppError::Config(format!("invalid probe_url '{}': {}", raw, e)))
    }

    /// Write the configuration file (unless `is_test`) and return the
    /// configuration that `init` should use.
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Self> {
        let dir = Self::config_dir();

        let database = match custom_db {
            Some(name) => {
                let p = expand_tilde(&name);
                if p.is_absolute() { p } else { dir.join(p) }
            }
            None => dir.join(DATABASE_FILE),
        };

        let config = Config {
            database: database.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            fs::create_dir_all(&dir)?;
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(e.to_string()))?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        Ok(config)
    }
}
