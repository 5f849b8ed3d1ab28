//! Configuration for the catalog adapter.

use std::path::PathBuf;
use std::time::Duration;

use array_loader::SourceConfig;
use serde::{Deserialize, Serialize};

/// Configuration for opening catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Timeout for each HTTP request, in seconds.
    pub http_timeout_secs: u64,

    /// User agent sent with STAC and range requests.
    pub user_agent: String,

    /// Size of one HTTP range request in bytes.
    pub range_block_size: u64,

    /// Optional YAML file with extra driver rules.
    pub driver_table_path: Option<PathBuf>,

    /// Register the PNG/JPEG loader.
    pub register_image_loader: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            user_agent: concat!("stac-catalog/", env!("CARGO_PKG_VERSION")).to_string(),
            range_block_size: 64 * 1024,
            driver_table_path: None,
            register_image_loader: false,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("STAC_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.http_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("STAC_USER_AGENT") {
            if !val.is_empty() {
                config.user_agent = val;
            }
        }

        if let Ok(val) = std::env::var("STAC_RANGE_BLOCK_SIZE") {
            if let Ok(size) = val.parse() {
                config.range_block_size = size;
            }
        }

        if let Ok(val) = std::env::var("STAC_DRIVER_TABLE") {
            if !val.is_empty() {
                config.driver_table_path = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("STAC_IMAGE_LOADER") {
            config.register_image_loader = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.http_timeout_secs == 0 {
            return Err("http_timeout_secs must be > 0".to_string());
        }

        if self.range_block_size < 1024 {
            return Err("range_block_size must be at least 1024 bytes".to_string());
        }

        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Byte-source settings handed to loaders.
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            timeout: self.http_timeout(),
            block_size: self.range_block_size,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CatalogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(!config.register_image_loader);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CatalogConfig {
            http_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            range_block_size: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CatalogConfig {
            user_agent: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_config() {
        let config = CatalogConfig {
            http_timeout_secs: 5,
            range_block_size: 4096,
            ..Default::default()
        };
        let source = config.source_config();
        assert_eq!(source.timeout, Duration::from_secs(5));
        assert_eq!(source.block_size, 4096);
        assert!(source.user_agent.starts_with("stac-catalog/"));
    }
}
