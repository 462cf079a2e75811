use crate::error::Result;
use crate::models::Credentials;
use crate::services::storage::{StorageClient, StorageClientFactory};
use std::sync::Arc;
use tokio::sync::Mutex;

struct CachedClient {
    credentials: Credentials,
    client: Arc<dyn StorageClient>,
}

/// Holds the one storage client shared across calls.
///
/// The client is built on first use and rebuilt only when a call arrives
/// with different credentials. The lock is held across construction, so
/// overlapping first calls build exactly once.
pub struct ClientCache {
    factory: Arc<dyn StorageClientFactory>,
    cached: Mutex<Option<CachedClient>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn StorageClientFactory>) -> Self {
        Self {
            factory,
            cached: Mutex::new(None),
        }
    }

    pub async fn get_or_build(&self, credentials: &Credentials) -> Result<Arc<dyn StorageClient>> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.credentials == *credentials {
                return Ok(entry.client.clone());
            }
            tracing::info!("Credentials changed, rebuilding storage client");
        }

        let client = self.factory.build(credentials)?;
        *cached = Some(CachedClient {
            credentials: credentials.clone(),
            client: client.clone(),
        });
        Ok(client)
    }

    #[cfg(test)]
    async fn clear(&self) {
        self.cached.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::services::storage::{PresignTarget, UploadTarget};
    use crate::services::transfer::TransferHandle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullClient;

    #[async_trait]
    impl StorageClient for NullClient {
        fn upload(&self, _target: UploadTarget) -> TransferHandle {
            let (reporter, handle) = TransferHandle::channel();
            reporter.complete();
            handle
        }

        async fn presign_get(&self, _target: &PresignTarget) -> Result<String> {
            Ok("https://example.invalid".to_string())
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        builds: AtomicUsize,
    }

    impl StorageClientFactory for CountingFactory {
        fn build(&self, credentials: &Credentials) -> Result<Arc<dyn StorageClient>> {
            if credentials.access_key == "broken" {
                return Err(BridgeError::ClientSetup("rejected".to_string()));
            }
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullClient))
        }
    }

    #[tokio::test]
    async fn test_same_credentials_reuse_client() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ClientCache::new(factory.clone());
        let creds = Credentials::new("AKIA", "secret");

        let first = cache.get_or_build(&creds).await.unwrap();
        let second = cache.get_or_build(&creds).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_credentials_rebuild() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ClientCache::new(factory.clone());

        cache.get_or_build(&Credentials::new("AKIA", "one")).await.unwrap();
        cache.get_or_build(&Credentials::new("AKIA", "two")).await.unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 2);

        cache.clear().await;
        cache.get_or_build(&Credentials::new("AKIA", "two")).await.unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_builds_once() {
        let factory = Arc::new(CountingFactory::default());
        let cache = Arc::new(ClientCache::new(factory.clone()));
        let creds = Credentials::new("AKIA", "secret");

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let creds = creds.clone();
                tokio::spawn(async move { cache.get_or_build(&creds).await.map(|_| ()) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_build_failure_is_not_cached() {
        let factory = Arc::new(CountingFactory::default());
        let cache = ClientCache::new(factory.clone());

        assert!(cache.get_or_build(&Credentials::new("broken", "x")).await.is_err());
        cache.get_or_build(&Credentials::new("AKIA", "x")).await.unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }
}
