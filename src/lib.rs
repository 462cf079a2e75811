pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use config::BridgeConfig;
pub use error::BridgeError;
pub use models::{MethodCall, MethodResponse};
pub use services::adapter::RequestAdapter;
