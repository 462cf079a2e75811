pub mod adapter;
pub mod client_cache;
pub mod progress;
pub mod storage;
pub mod transfer;
