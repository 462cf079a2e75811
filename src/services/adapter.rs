use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::models::{
    METHOD_CALL_PRESIGNED, METHOD_CALL_UPLOAD, MethodCall, MethodResponse, PresignRequest,
    UploadRequest,
};
use crate::services::client_cache::ClientCache;
use crate::services::progress::{ProgressStream, ProgressSubscription};
use crate::services::storage::{
    PresignTarget, S3ClientFactory, StorageClientFactory, upload_target,
};
use crate::services::transfer::TransferOutcome;
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::object_key::compose_object_key;
use crate::utils::region::parse_region;
use chrono::Duration;
use std::sync::Arc;

/// Validity window of presigned URLs. Fixed policy, not a tunable default.
pub const PRESIGN_EXPIRATION_MINUTES: i64 = 480;

/// Turns host method calls into storage client operations.
pub struct RequestAdapter {
    clients: ClientCache,
    progress: ProgressStream,
    clock: Arc<dyn Clock>,
}

impl RequestAdapter {
    pub fn new(factory: Arc<dyn StorageClientFactory>) -> Self {
        Self {
            clients: ClientCache::new(factory),
            progress: ProgressStream::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: BridgeConfig) -> Self {
        Self::new(Arc::new(S3ClientFactory::new(config)))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn handle_method_call(&self, call: MethodCall) -> MethodResponse {
        match call.method.as_str() {
            METHOD_CALL_UPLOAD => {
                let request = match UploadRequest::from_arguments(&call.arguments) {
                    Ok(request) => request,
                    Err(e) => {
                        tracing::warn!("Invalid upload arguments: {}", e);
                        return MethodResponse::error(&e);
                    }
                };
                match self.handle_upload(request).await {
                    Ok(result) => MethodResponse::success(result),
                    Err(e) => {
                        tracing::warn!(code = e.code(), "Upload setup failed: {}", e);
                        MethodResponse::error(&e)
                    }
                }
            }
            METHOD_CALL_PRESIGNED => match PresignRequest::from_arguments(&call.arguments) {
                Ok(request) => MethodResponse::success(self.handle_presign(request).await),
                Err(e) => {
                    tracing::warn!("Invalid presign arguments: {}", e);
                    MethodResponse::success(None)
                }
            },
            other => {
                tracing::debug!("Method not implemented: {}", other);
                MethodResponse::NotImplemented
            }
        }
    }

    /// Uploads the request's file and waits for the transfer to finish.
    ///
    /// Returns the file name on success and `None` when the transfer fails.
    /// Errors are setup failures that happened before any transfer started.
    pub async fn handle_upload(&self, request: UploadRequest) -> Result<Option<String>> {
        tracing::debug!("Upload requested for {}", request.file_path.display());

        let region = request.region.as_deref().map(parse_region).transpose()?;

        let metadata = tokio::fs::metadata(&request.file_path).await?;
        if !metadata.is_file() {
            return Err(BridgeError::ClientSetup(format!(
                "{} is not a file",
                request.file_path.display()
            )));
        }

        let client = self
            .clients
            .get_or_build(&request.credentials)
            .await
            .inspect_err(|e| tracing::error!("Storage client setup failed: {}", e))?;

        let key = compose_object_key(request.folder.as_deref(), &request.file_name);
        let mut handle = client.upload(upload_target(
            &request.bucket,
            &key,
            &request.file_path,
            region.as_deref(),
        ));

        while let Some(progress) = handle.next_progress().await {
            self.on_progress(progress.bytes_current, progress.bytes_total);
        }

        match handle.outcome().await {
            TransferOutcome::Completed => {
                tracing::info!("Upload completed: {}", request.file_name);
                Ok(Some(request.file_name))
            }
            TransferOutcome::Failed(reason) => {
                tracing::warn!("Upload failed: {} ({})", request.file_name, reason);
                self.progress.invalidate();
                Ok(None)
            }
        }
    }

    /// Presigned GET URL valid for eight hours, or `None` on any failure.
    pub async fn handle_presign(&self, request: PresignRequest) -> Option<String> {
        match self.presign(&request).await {
            Ok(url) => {
                tracing::info!("Presigned URL generated for {}", request.file_name);
                Some(url)
            }
            Err(e) => {
                tracing::warn!(code = e.code(), "Failed to create pre-signed URL: {}", e);
                None
            }
        }
    }

    async fn presign(&self, request: &PresignRequest) -> Result<String> {
        let region = parse_region(&request.region)?;
        let client = self.clients.get_or_build(&request.credentials).await?;

        let signed_at = self.clock.now();
        let target = PresignTarget {
            bucket: request.bucket.clone(),
            key: compose_object_key(request.folder.as_deref(), &request.file_name),
            region,
            signed_at,
            expires_at: signed_at + Duration::minutes(PRESIGN_EXPIRATION_MINUTES),
        };

        client.presign_get(&target).await
    }

    pub fn on_progress(&self, bytes_current: u64, bytes_total: u64) {
        self.progress.on_progress(bytes_current, bytes_total);
    }

    pub fn on_listen(&self) -> ProgressSubscription {
        self.progress.on_listen()
    }

    pub fn on_cancel(&self) {
        self.progress.on_cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Credentials;
    use crate::services::storage::StorageClient;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Mutex;

    struct RejectingFactory;

    impl StorageClientFactory for RejectingFactory {
        fn build(&self, _credentials: &Credentials) -> Result<Arc<dyn StorageClient>> {
            Err(BridgeError::ClientSetup("rejected".to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_upload_setup_failure_is_logged() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let adapter = RequestAdapter::new(Arc::new(RejectingFactory));
        let arguments = json!({
            "filePath": "/definitely/not/here.jpg",
            "fileNameWithExt": "here.jpg",
            "bucketName": "media",
            "AWSAccess": "AKIA",
            "AWSSecret": "secret",
        });
        let response = adapter
            .handle_method_call(MethodCall::new(
                METHOD_CALL_UPLOAD,
                arguments.as_object().unwrap().clone(),
            ))
            .await;

        assert!(matches!(
            response,
            MethodResponse::Error { ref code, .. } if code == "UPLOAD_SETUP_FAILED"
        ));
        let output = logs.contents();
        assert!(output.contains("WARN"));
        assert!(output.contains("Upload setup failed"));
        assert!(output.contains("code=\"UPLOAD_SETUP_FAILED\""));
    }
}
