use std::env;
use std::time::Duration;

/// Smallest part size S3 accepts for every part but the last of a multipart upload.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Storage client configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Connect timeout in milliseconds (default: 250000)
    pub connect_timeout_ms: u64,

    /// Socket read timeout in milliseconds (default: 250000)
    pub socket_timeout_ms: u64,

    /// Region used when an upload does not name one (default: "us-east-1")
    pub default_region: String,

    /// Endpoint override for S3-compatible stores such as MinIO
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing (default: false)
    pub force_path_style: bool,

    /// Multipart upload part size in bytes (default: 5 MB)
    pub part_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 250_000,
            socket_timeout_ms: 250_000,
            default_region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            part_size: MIN_PART_SIZE,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            connect_timeout_ms: env::var("S3_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.connect_timeout_ms),

            socket_timeout_ms: env::var("S3_SOCKET_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.socket_timeout_ms),

            default_region: env::var("S3_DEFAULT_REGION").unwrap_or(default.default_region),

            endpoint_url: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.force_path_style),

            part_size: env::var("S3_PART_SIZE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| v.max(MIN_PART_SIZE))
                .unwrap_or(default.part_size),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.connect_timeout(), Duration::from_millis(250_000));
        assert_eq!(config.socket_timeout(), Duration::from_millis(250_000));
        assert_eq!(config.default_region, "us-east-1");
        assert_eq!(config.part_size, MIN_PART_SIZE);
        assert!(config.endpoint_url.is_none());
        assert!(!config.force_path_style);
    }

    #[test]
    fn test_from_env_part_size_floor() {
        unsafe { env::set_var("S3_PART_SIZE", "1024") };
        let config = BridgeConfig::from_env();
        unsafe { env::remove_var("S3_PART_SIZE") };
        assert_eq!(config.part_size, MIN_PART_SIZE);
    }
}
