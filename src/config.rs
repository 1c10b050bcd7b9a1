//! Run configuration and secrets.
//!
//! Everything tunable lives in one TOML file (default `gallery.toml`,
//! overridable with `--config`). Options:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [catalog]
//! dir = "content/albums"     # Previously-published album documents (omit to skip merging)
//!
//! [renditions]
//! enabled = true
//! widths = [2160, 1080, 540, 220]  # Target widths, strictly descending
//! quality = 90                     # JPEG encode quality (1-100)
//!
//! [storage]
//! enabled = true
//! public_root = "https://photos.example.net"  # Stripped from the base URL to form blob paths
//!
//! [commerce]
//! enabled = true
//! update_products = true     # Refresh name/images/tax code of existing products
//! currency = "usd"
//! unit_amount = 2000         # Price in minor units (cents)
//! not_for_sale = []          # uniqueIDs excluded from sale
//!
//! [secrets]
//! hash_key = "..."           # Keyed-hash secret for uniqueID derivation (required)
//! commerce_api_key = "..."   # Required when commerce is enabled
//! storage_connection = "..." # Required when storage is enabled
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown keys
//! are rejected to catch typos early. Secrets are required only when the
//! stage that consumes them is enabled, so a local dry run needs nothing but
//! `hash_key`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full run configuration loaded from `gallery.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub catalog: CatalogConfig,
    pub renditions: RenditionsConfig,
    pub storage: StorageConfig,
    pub commerce: CommerceConfig,
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Directory of previously-authored album documents. `None` disables
    /// catalog merging entirely.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionsConfig {
    pub enabled: bool,
    /// Target widths, strictly descending. Each resize reuses the previous
    /// step's output, so order is semantic — see [`crate::renditions`].
    pub widths: Vec<u32>,
    /// JPEG encode quality (1-100).
    pub quality: u8,
}

impl Default for RenditionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            widths: vec![2160, 1080, 540, 220],
            quality: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub enabled: bool,
    /// Public URL root served by the blob CDN. The remainder of an album's
    /// base URL after this prefix becomes the blob path within the container.
    pub public_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_root: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommerceConfig {
    pub enabled: bool,
    /// Refresh display name, image set, and tax code of products that
    /// already exist remotely.
    pub update_products: bool,
    pub currency: String,
    /// Unit amount in the currency's minor units.
    pub unit_amount: i64,
    /// uniqueIDs of photos excluded from sale.
    pub not_for_sale: Vec<String>,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_products: true,
            currency: "usd".to_string(),
            unit_amount: 2000,
            not_for_sale: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Secrets {
    /// Keyed-hash secret for uniqueID derivation. Changing it changes every
    /// ID and orphans all previously-created commerce objects.
    pub hash_key: String,
    pub commerce_api_key: String,
    pub storage_connection: String,
}

/// Load configuration from the given path.
///
/// A missing file yields the stock defaults; [`RunConfig::validate`] then
/// reports the missing secrets with a clearer message than a bare IO error.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    if !path.exists() {
        return Ok(RunConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: RunConfig = toml::from_str(&content)?;
    Ok(config)
}

impl RunConfig {
    /// Validate cross-field constraints and the presence of the secrets that
    /// enabled stages require.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secrets.hash_key.is_empty() {
            return Err(ConfigError::Validation(
                "secrets.hash_key is required".into(),
            ));
        }
        if self.commerce.enabled && self.secrets.commerce_api_key.is_empty() {
            return Err(ConfigError::Validation(
                "secrets.commerce_api_key is required when commerce is enabled".into(),
            ));
        }
        if self.storage.enabled && self.secrets.storage_connection.is_empty() {
            return Err(ConfigError::Validation(
                "secrets.storage_connection is required when storage is enabled".into(),
            ));
        }
        if self.renditions.enabled {
            if self.renditions.widths.is_empty() {
                return Err(ConfigError::Validation(
                    "renditions.widths must not be empty".into(),
                ));
            }
            if !self.renditions.widths.windows(2).all(|w| w[0] > w[1]) {
                return Err(ConfigError::Validation(
                    "renditions.widths must be strictly descending".into(),
                ));
            }
            if self.renditions.quality == 0 || self.renditions.quality > 100 {
                return Err(ConfigError::Validation(
                    "renditions.quality must be 1-100".into(),
                ));
            }
        }
        if self.commerce.enabled && self.commerce.unit_amount <= 0 {
            return Err(ConfigError::Validation(
                "commerce.unit_amount must be positive".into(),
            ));
        }
        Ok(())
    }
}
