use anyhow::{Context, Result, anyhow};
use pinchain_core::NetworkType;
use pinchain_core::checkpoint::DohTxtResolver;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: String,
    pub network: NetworkType,
    /// JSON checkpoint file; `<data_dir>/checkpoints.json` when unset.
    pub checkpoints_file: Option<String>,
    pub enable_dns_checkpoints: bool,
    pub doh_endpoint: String,
    pub dns_timeout_secs: u64,
    pub dns_refresh_interval_secs: u64,
}

impl Config {
    pub const FILE_NAME: &'static str = "config.json";
    pub const CHECKPOINTS_FILE_NAME: &'static str = "checkpoints.json";

    fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path);
        PathBuf::from(expanded.into_owned())
    }

    fn home_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Compute the default data directory depending on the target OS.
    fn default_data_dir() -> String {
        // Use a Windows-friendly folder when building on Windows to avoid tilde expansion issues.
        if cfg!(target_os = "windows") {
            let base = dirs::data_dir()
                .unwrap_or_else(Self::home_dir)
                .join("Pinchain");
            return base.join("data").to_string_lossy().into_owned();
        }

        Self::home_dir()
            .join(".pinchain")
            .join("data")
            .to_string_lossy()
            .into_owned()
    }

    pub fn default_path() -> PathBuf {
        Self::home_dir().join(".pinchain").join(Self::FILE_NAME)
    }

    /// Data directory with tilde expansion applied.
    pub fn data_dir_resolved(&self) -> PathBuf {
        Self::expand_path(&self.data_dir)
    }

    pub fn checkpoints_file_resolved(&self) -> PathBuf {
        match &self.checkpoints_file {
            Some(path) => Self::expand_path(path),
            None => self.data_dir_resolved().join(Self::CHECKPOINTS_FILE_NAME),
        }
    }

    /// Load from the default location, writing a default file if none exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Configuration file not found. Creating default configuration: {:?}",
                path
            );
            let cfg = Self::default();
            cfg.save_to(path)?;
            return Ok(cfg);
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {:?}", path))?;
        serde_json::from_str(&data)
            .with_context(|| format!("configuration file format error in {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = value.to_string(),
            "network" => self.network = value.parse().map_err(|e: String| anyhow!(e))?,
            "checkpoints_file" => {
                self.checkpoints_file = (!value.is_empty()).then(|| value.to_string())
            }
            "enable_dns_checkpoints" => {
                self.enable_dns_checkpoints = value
                    .parse()
                    .with_context(|| format!("{} expects true or false", key))?
            }
            "doh_endpoint" => self.doh_endpoint = value.to_string(),
            "dns_timeout_secs" => {
                self.dns_timeout_secs = value
                    .parse()
                    .with_context(|| format!("{} expects seconds", key))?
            }
            "dns_refresh_interval_secs" => {
                self.dns_refresh_interval_secs = value
                    .parse()
                    .with_context(|| format!("{} expects seconds", key))?
            }
            _ => return Err(anyhow!("Unknown configuration key: {}", key)),
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            network: NetworkType::Mainnet,
            checkpoints_file: None,
            enable_dns_checkpoints: true,
            doh_endpoint: DohTxtResolver::DEFAULT_ENDPOINT.to_string(),
            dns_timeout_secs: 10,
            dns_refresh_interval_secs: 3600,
        }
    }
}
