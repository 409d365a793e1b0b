use crate::constants::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVICE_URL};
use crate::formats::{ArchiveFormat, ImageType};
use crate::locale::Language;
use std::path::PathBuf;
use std::time::Duration;

/// Where and how to reach the compression service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    pub fn new(base_url: Option<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
            timeout: timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub paths: Vec<PathBuf>,
    pub convert: Option<ImageType>,
    pub recursive: bool,
    /// Archive format to produce after compression, `None` when archiving is off
    pub archive: Option<ArchiveFormat>,
    pub language: Language,
    pub service: ServiceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_config_default() {
        let config = ServiceConfig::default();
        assert_eq!(config.base_url, "https://tinypng.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_service_config_new() {
        let config = ServiceConfig::new(Some("http://127.0.0.1:9000".to_string()), Some(5));
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
