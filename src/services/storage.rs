use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::models::{Credentials, TransferState};
use crate::services::transfer::{TransferHandle, TransferReporter};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncReadExt;

/// Where a local file goes.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub bucket: String,
    pub key: String,
    pub file: PathBuf,
    /// Region code; the client's default region when `None`.
    pub region: Option<String>,
}

/// A presigned GET request to generate.
#[derive(Debug, Clone)]
pub struct PresignTarget {
    pub bucket: String,
    pub key: String,
    pub region: String,
    pub signed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Starts uploading `target.file` with a private ACL and returns at once.
    fn upload(&self, target: UploadTarget) -> TransferHandle;

    async fn presign_get(&self, target: &PresignTarget) -> Result<String>;
}

/// Builds storage clients from caller-supplied credentials.
pub trait StorageClientFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> Result<Arc<dyn StorageClient>>;
}

pub struct S3StorageClient {
    client: Client,
    part_size: usize,
}

impl S3StorageClient {
    pub fn new(client: Client, part_size: usize) -> Self {
        Self { client, part_size }
    }

    fn client_for_region(&self, region: Option<&str>) -> Client {
        match region {
            Some(region) => {
                let config = self
                    .client
                    .config()
                    .to_builder()
                    .region(Region::new(region.to_string()))
                    .build();
                Client::from_conf(config)
            }
            None => self.client.clone(),
        }
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    fn upload(&self, target: UploadTarget) -> TransferHandle {
        let (reporter, handle) = TransferHandle::channel();
        let client = self.client_for_region(target.region.as_deref());
        let part_size = self.part_size;

        tokio::spawn(async move {
            run_upload(client, target, part_size, reporter).await;
        });

        handle
    }

    async fn presign_get(&self, target: &PresignTarget) -> Result<String> {
        let expires_in = (target.expires_at - target.signed_at)
            .to_std()
            .map_err(|e| BridgeError::Presign(e.to_string()))?;

        let presigning_config = PresigningConfig::builder()
            .start_time(SystemTime::from(target.signed_at))
            .expires_in(expires_in)
            .build()
            .map_err(|e| BridgeError::Presign(DisplayErrorContext(&e).to_string()))?;

        let presigned_request = self
            .client_for_region(Some(&target.region))
            .get_object()
            .bucket(&target.bucket)
            .key(&target.key)
            .presigned(presigning_config)
            .await
            .map_err(|e| BridgeError::Presign(DisplayErrorContext(&e).to_string()))?;

        Ok(presigned_request.uri().to_string())
    }
}

async fn run_upload(
    client: Client,
    target: UploadTarget,
    part_size: usize,
    mut reporter: TransferReporter,
) {
    tracing::info!("Uploading {} to {}/{}", target.file.display(), target.bucket, target.key);

    match upload_file(&client, &target, part_size, &mut reporter).await {
        Ok(()) => {
            tracing::info!("Upload of {} completed", target.key);
            reporter.complete();
        }
        Err(e) => {
            tracing::error!(code = e.code(), "Upload of {} failed: {}", target.key, e);
            reporter.fail(e.to_string());
        }
    }
}

async fn upload_file(
    client: &Client,
    target: &UploadTarget,
    part_size: usize,
    reporter: &mut TransferReporter,
) -> Result<()> {
    let mut file = tokio::fs::File::open(&target.file).await?;
    let total = file.metadata().await?.len();

    reporter.state_changed(TransferState::InProgress);
    reporter.progress(0, total);

    if total <= part_size as u64 {
        let mut data = Vec::with_capacity(total as usize);
        file.read_to_end(&mut data).await?;

        client
            .put_object()
            .bucket(&target.bucket)
            .key(&target.key)
            .acl(ObjectCannedAcl::Private)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| BridgeError::Transfer(DisplayErrorContext(&e).to_string()))?;

        reporter.progress(total, total);
        return Ok(());
    }

    let multipart_upload_res = client
        .create_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .acl(ObjectCannedAcl::Private)
        .send()
        .await
        .map_err(|e| BridgeError::Transfer(DisplayErrorContext(&e).to_string()))?;

    let upload_id = multipart_upload_res
        .upload_id()
        .ok_or_else(|| BridgeError::Transfer("No upload ID".to_string()))?
        .to_string();

    let parts = match upload_parts(client, target, &upload_id, file, total, part_size, reporter)
        .await
    {
        Ok(parts) => parts,
        Err(e) => {
            abort_upload(client, target, &upload_id).await;
            return Err(e);
        }
    };

    let completed_multipart_upload = CompletedMultipartUpload::builder()
        .set_parts(Some(parts))
        .build();

    if let Err(e) = client
        .complete_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(&upload_id)
        .multipart_upload(completed_multipart_upload)
        .send()
        .await
    {
        abort_upload(client, target, &upload_id).await;
        return Err(BridgeError::Transfer(DisplayErrorContext(&e).to_string()));
    }

    Ok(())
}

async fn upload_parts(
    client: &Client,
    target: &UploadTarget,
    upload_id: &str,
    mut file: tokio::fs::File,
    total: u64,
    part_size: usize,
    reporter: &mut TransferReporter,
) -> Result<Vec<CompletedPart>> {
    let mut part_number = 1;
    let mut completed_parts = Vec::new();
    let mut sent: u64 = 0;
    let mut buffer = vec![0u8; part_size];

    loop {
        let mut n = 0;
        while n < part_size {
            let read = file.read(&mut buffer[n..]).await?;
            if read == 0 {
                break;
            }
            n += read;
        }

        if n == 0 {
            break;
        }

        let body = ByteStream::from(Bytes::copy_from_slice(&buffer[..n]));
        let upload_part_res = client
            .upload_part()
            .bucket(&target.bucket)
            .key(&target.key)
            .upload_id(upload_id)
            .body(body)
            .part_number(part_number)
            .send()
            .await
            .map_err(|e| BridgeError::Transfer(DisplayErrorContext(&e).to_string()))?;

        completed_parts.push(
            CompletedPart::builder()
                .e_tag(upload_part_res.e_tag().unwrap_or_default())
                .part_number(part_number)
                .build(),
        );

        sent += n as u64;
        reporter.progress(sent, total);
        part_number += 1;
    }

    Ok(completed_parts)
}

async fn abort_upload(client: &Client, target: &UploadTarget, upload_id: &str) {
    if let Err(e) = client
        .abort_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .send()
        .await
    {
        tracing::warn!(
            "Failed to abort multipart upload {} for {}: {}",
            upload_id,
            target.key,
            DisplayErrorContext(&e)
        );
    }
}

/// Builds `aws-sdk-s3` clients with static credentials and the bridge's
/// timeout settings.
pub struct S3ClientFactory {
    config: BridgeConfig,
}

impl S3ClientFactory {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

impl StorageClientFactory for S3ClientFactory {
    fn build(&self, credentials: &Credentials) -> Result<Arc<dyn StorageClient>> {
        if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(BridgeError::ClientSetup(
                "access key and secret key are required".to_string(),
            ));
        }

        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(self.config.connect_timeout())
            .read_timeout(self.config.socket_timeout())
            .build();

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.config.default_region.clone()))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                credentials.access_key.clone(),
                credentials.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .timeout_config(timeout_config)
            .force_path_style(self.config.force_path_style);

        if let Some(endpoint_url) = &self.config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        tracing::info!(
            "☁️  S3 client built (region: {}, access key: {})",
            self.config.default_region,
            credentials.access_key
        );

        let client = Client::from_conf(builder.build());
        Ok(Arc::new(S3StorageClient::new(client, self.config.part_size)))
    }
}

/// Convenience for callers that only have a path.
pub fn upload_target(bucket: &str, key: &str, file: &Path, region: Option<&str>) -> UploadTarget {
    UploadTarget {
        bucket: bucket.to_string(),
        key: key.to_string(),
        file: file.to_path_buf(),
        region: region.map(str::to_string),
    }
}
