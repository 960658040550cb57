use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that points at an alternate config file
pub const CONFIG_ENV: &str = "PACKDESK_CONFIG";

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_RESOURCE_PREFIX: &str = "/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Prefix for resource endpoints; login/register/profile live directly under `base_url`
    #[serde(default = "default_resource_prefix")]
    pub resource_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_flash_secs")]
    pub flash_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Override for the remembered-credentials file
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Keep the password in the remembered record (plaintext)
    #[serde(default = "default_true")]
    pub store_password: bool,
}

fn default_resource_prefix() -> String { DEFAULT_RESOURCE_PREFIX.to_string() }
fn default_timeout_secs() -> u64 { 30 }
fn default_poll_interval_secs() -> u64 { 30 }
fn default_flash_secs() -> u64 { 3 }
fn default_page_size() -> u32 { 10 }
fn default_true() -> bool { true }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource_prefix: default_resource_prefix(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            flash_secs: default_flash_secs(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: None,
            store_password: true,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn flash_duration(&self) -> Duration {
        Duration::from_secs(self.flash_secs)
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "packdesk", "packdesk")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

impl Config {
    /// Config file location: `PACKDESK_CONFIG` if set, else the platform config dir
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let proj_dirs = project_dirs()?;
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for the remembered-credentials file and the TUI log
    pub fn data_dir() -> Result<PathBuf> {
        let proj_dirs = project_dirs()?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.to_path_buf())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.credentials.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("remembered.json")),
        }
    }

    /// Set a value by its dotted key, e.g. `api.base_url`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" => self.api.base_url = value.trim_end_matches('/').to_string(),
            "api.resource_prefix" => self.api.resource_prefix = value.to_string(),
            "api.timeout_secs" => self.api.timeout_secs = value.parse()?,
            "dashboard.poll_interval_secs" => self.dashboard.poll_interval_secs = value.parse()?,
            "dashboard.flash_secs" => self.dashboard.flash_secs = value.parse()?,
            "admin.page_size" => self.admin.page_size = value.parse()?,
            "credentials.path" => self.credentials.path = Some(PathBuf::from(value)),
            "credentials.store_password" => self.credentials.store_password = value.parse()?,
            _ => anyhow::bail!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "api.base_url" => self.api.base_url.clone(),
            "api.resource_prefix" => self.api.resource_prefix.clone(),
            "api.timeout_secs" => self.api.timeout_secs.to_string(),
            "dashboard.poll_interval_secs" => self.dashboard.poll_interval_secs.to_string(),
            "dashboard.flash_secs" => self.dashboard.flash_secs.to_string(),
            "admin.page_size" => self.admin.page_size.to_string(),
            "credentials.path" => self
                .credentials
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            "credentials.store_password" => self.credentials.store_password.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        };
        Ok(value)
    }

    pub const KEYS: [&'static str; 8] = [
        "api.base_url",
        "api.resource_prefix",
        "api.timeout_secs",
        "dashboard.poll_interval_secs",
        "dashboard.flash_secs",
        "admin.page_size",
        "credentials.path",
        "credentials.store_password",
    ];
}
