use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::doping::DopingTier;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub listing: ListingConfig,
    pub search: SearchConfig,
    pub chat: ChatConfig,
    pub catalog: CatalogConfig,
    pub doping: DopingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingConfig {
    pub require_approval: bool,
    pub expiry_days: u32,
    pub max_images: u32,
    pub max_title_len: u32,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub featured_first: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    pub max_message_len: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Slug path under which brand/model/submodel lookups start.
    pub vehicle_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DopingConfig {
    pub urgent: DopingPackage,
    pub premium: DopingPackage,
    pub gold: DopingPackage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DopingPackage {
    pub days: u32,
    pub price: i64,
}

impl DopingConfig {
    pub fn package(&self, tier: DopingTier) -> DopingPackage {
        match tier {
            DopingTier::Urgent => self.urgent,
            DopingTier::Premium => self.premium,
            DopingTier::Gold => self.gold,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config '{}': {}", path.display(), source)
            }
            ConfigError::Toml(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Invalid(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let overlay = match path {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|source| {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            })?),
            None => None,
        };
        let config = Self::from_layers(overlay.as_deref())?;
        tracing::debug!(
            config = path.map(|p| p.display().to_string()).unwrap_or_default(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub(crate) fn from_layers(overlay: Option<&str>) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(DEFAULTS_TOML)?;
        if let Some(raw) = overlay {
            let user: toml::Table = toml::from_str(raw)?;
            merge_tables(&mut base, user);
        }
        let config: Config = toml::Value::Table(base).try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search.default_page_size == 0 || self.search.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "search page sizes must be at least 1".to_string(),
            ));
        }
        if self.search.default_page_size > self.search.max_page_size {
            return Err(ConfigError::Invalid(
                "search.default_page_size cannot exceed search.max_page_size".to_string(),
            ));
        }
        if self.listing.expiry_days == 0 {
            return Err(ConfigError::Invalid(
                "listing.expiry_days must be at least 1".to_string(),
            ));
        }
        if self.listing.max_title_len == 0 || self.chat.max_message_len == 0 {
            return Err(ConfigError::Invalid(
                "length limits must be at least 1".to_string(),
            ));
        }
        if self.listing.currency.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "listing.currency cannot be empty".to_string(),
            ));
        }
        for tier in DopingTier::ALL {
            let package = self.doping.package(tier);
            if package.days == 0 {
                return Err(ConfigError::Invalid(format!(
                    "doping.{tier}.days must be at least 1"
                )));
            }
            if package.price < 0 {
                return Err(ConfigError::Invalid(format!(
                    "doping.{tier}.price cannot be negative"
                )));
            }
        }
        Ok(())
    }

    pub fn clamp_page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.search.default_page_size)
            .clamp(1, self.search.max_page_size)
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
