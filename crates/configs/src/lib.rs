use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_password")]
    pub default_password: String,
    #[serde(default = "default_lock_max_attempts")]
    pub lock_max_attempts: u32,
    #[serde(default = "default_lock_retry_delay_ms")]
    pub lock_retry_delay_ms: u64,
    /// `recover` or `fail`
    #[serde(default = "default_on_corrupt")]
    pub on_corrupt: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            default_password: default_password(),
            lock_max_attempts: default_lock_max_attempts(),
            lock_retry_delay_ms: default_lock_retry_delay_ms(),
            on_corrupt: default_on_corrupt(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self { path: default_catalog_path() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_store_path() -> String { "data/school_data.json".into() }
fn default_password() -> String { "admin123".into() }
fn default_lock_max_attempts() -> u32 { 10 }
fn default_lock_retry_delay_ms() -> u64 { 100 }
fn default_on_corrupt() -> String { "recover".into() }
fn default_catalog_path() -> String { "classes.json".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`); a missing file yields the defaults.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 环境变量优先于 TOML 中的路径
        self.store.normalize_from_env();
        self.catalog.normalize_from_env();
        self.store.validate()?;
        self.catalog.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(path) = std::env::var("REGISTRY_DATA_PATH") {
            if !path.trim().is_empty() {
                self.path = path;
            }
        }
        self.on_corrupt = self.on_corrupt.trim().to_ascii_lowercase();
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(anyhow!("store.path must not be empty"));
        }
        if self.default_password.is_empty() {
            return Err(anyhow!("store.default_password must not be empty"));
        }
        if self.lock_max_attempts == 0 {
            return Err(anyhow!("store.lock_max_attempts must be >= 1"));
        }
        if !matches!(self.on_corrupt.as_str(), "recover" | "fail") {
            return Err(anyhow!("store.on_corrupt must be 'recover' or 'fail', got '{}'", self.on_corrupt));
        }
        Ok(())
    }
}

impl CatalogConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(path) = std::env::var("REGISTRY_CATALOG_PATH") {
            if !path.trim().is_empty() {
                self.path = path;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(anyhow!("catalog.path must not be empty"));
        }
        Ok(())
    }
}
