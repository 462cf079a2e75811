use crate::config::BridgeConfig;
use crate::services::adapter::RequestAdapter;
use std::sync::Arc;
use tracing::info;

pub fn setup_adapter(config: BridgeConfig) -> Arc<RequestAdapter> {
    info!(
        "☁️  S3 bridge: region={}, endpoint={}, connect timeout={}ms, socket timeout={}ms",
        config.default_region,
        config.endpoint_url.as_deref().unwrap_or("aws"),
        config.connect_timeout_ms,
        config.socket_timeout_ms
    );

    Arc::new(RequestAdapter::from_config(config))
}
